//! Copilot flows.
//!
//! Each flow assembles context from the loaded [`Session`], renders a typed
//! prompt, and sends a system + user message pair to a [`ChatBackend`].
//! A failed call leaves the session exactly as it was.

use crate::analysis::{
    analysis_json, menu_performance, segment_performance, store_performance, trends,
    AnalysisKind,
};
use crate::charts::{build_chart, ChartType};
use crate::error::{Error, Result};
use crate::llm::client::{ChatBackend, ChatMessage, CompletionOptions};
use crate::llm::prompts::{
    AnalysisPrompt, ExplanationPrompt, InsightPrompt, PromptTemplate, QuestionPrompt,
    RecommendationPrompt, SystemRole,
};
use crate::session::Session;
use serde::Serialize;
use tracing::{debug, info};

const INSIGHT_TEMPERATURE: f32 = 0.3;
const QUESTION_TEMPERATURE: f32 = 0.2;
const RECOMMENDATION_TEMPERATURE: f32 = 0.4;
const EXPLANATION_TEMPERATURE: f32 = 0.3;

const MENU_KEYWORDS: [&str; 5] = ["menu", "makanan", "minuman", "item", "food"];
const STORE_KEYWORDS: [&str; 5] = ["store", "outlet", "cabang", "toko", "branch"];
const SEGMENT_KEYWORDS: [&str; 3] = ["segment", "customer", "pelanggan"];
const TREND_KEYWORDS: [&str; 3] = ["trend", "tren", "growth"];
const COMPARISON_KEYWORDS: [&str; 4] = ["compare", "banding", "versus", " vs "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InsightKind {
    General,
    SalesTrend,
    MenuOptimization,
    CustomerBehavior,
    StorePerformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecommendationKind {
    RevenueOptimization,
    OperationalEfficiency,
    MarketingStrategy,
    MenuStrategy,
}

/// Ties a chat backend to the response language and sampling defaults.
pub struct Copilot<B: ChatBackend> {
    backend: B,
    options: CompletionOptions,
    language: String,
}

impl<B: ChatBackend> Copilot<B> {
    pub fn new(backend: B, options: CompletionOptions, language: impl Into<String>) -> Self {
        Self {
            backend,
            options,
            language: language.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Narrative insight about the whole dataset or one aspect of it.
    pub async fn generate_insight(&self, session: &Session, kind: InsightKind) -> Result<String> {
        ensure_loaded(session)?;
        let table = session.table();
        let options = session.options();
        let context = session.context();

        let (prompt, temperature) = match kind {
            InsightKind::General => (
                InsightPrompt {
                    data_summary: &context,
                }
                .render(&self.language)?,
                INSIGHT_TEMPERATURE,
            ),
            InsightKind::SalesTrend => {
                let data = with_sections(&context, &[("SALES TRENDS", to_json(&trends(table)?)?)]);
                (
                    AnalysisPrompt::SalesTrend {
                        data_summary: &data,
                    }
                    .render(&self.language)?,
                    self.options.temperature,
                )
            }
            InsightKind::MenuOptimization => (
                AnalysisPrompt::MenuOptimization {
                    menu_data: &to_json(&menu_performance(table, options)?)?,
                }
                .render(&self.language)?,
                self.options.temperature,
            ),
            InsightKind::CustomerBehavior => (
                AnalysisPrompt::CustomerSegmentation {
                    segment_data: &to_json(&segment_performance(table)?)?,
                }
                .render(&self.language)?,
                self.options.temperature,
            ),
            InsightKind::StorePerformance => (
                AnalysisPrompt::StorePerformance {
                    store_data: &to_json(&store_performance(table, options)?)?,
                }
                .render(&self.language)?,
                self.options.temperature,
            ),
        };

        info!("Generating {:?} insight", kind);
        self.send(SystemRole::DataAnalyst, prompt, temperature).await
    }

    /// Answer a free-form question and record the exchange in the session.
    ///
    /// Menu, store and segment analyses are appended to the context when
    /// the question mentions them.
    pub async fn answer_question(&self, session: &mut Session, question: &str) -> Result<String> {
        ensure_loaded(session)?;
        let lowered = format!(" {} ", question.to_lowercase());
        let mentions = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        let table = session.table();
        let options = session.options();
        let mut sections = Vec::new();
        if mentions(&MENU_KEYWORDS) {
            sections.push(("MENU PERFORMANCE DATA", to_json(&menu_performance(table, options)?)?));
        }
        if mentions(&STORE_KEYWORDS) {
            let stores = store_performance(table, options)?;
            sections.push(("STORE PERFORMANCE DATA", to_json(&stores)?));
        }
        if mentions(&SEGMENT_KEYWORDS) {
            sections.push(("CUSTOMER SEGMENT DATA", to_json(&segment_performance(table)?)?));
        }
        if mentions(&TREND_KEYWORDS) {
            sections.push(("SALES TRENDS", to_json(&trends(table)?)?));
        }
        debug!("Question context sections: {}", sections.len());

        let data = with_sections(&session.context(), &sections);
        let template = if mentions(&TREND_KEYWORDS) {
            QuestionPrompt::Trend {
                question,
                trend_data: &data,
            }
        } else if mentions(&COMPARISON_KEYWORDS) {
            QuestionPrompt::Comparison {
                question,
                comparison_data: &data,
            }
        } else {
            QuestionPrompt::General {
                question,
                data_context: &data,
            }
        };
        let prompt = template.render(&self.language)?;

        let answer = self
            .send(SystemRole::QaAssistant, prompt, QUESTION_TEMPERATURE)
            .await?;
        session.record_exchange(question, answer.clone());
        Ok(answer)
    }

    /// Strategic recommendations, optionally steered by business goals.
    pub async fn recommend(
        &self,
        session: &Session,
        kind: RecommendationKind,
        business_goals: Option<&str>,
    ) -> Result<String> {
        ensure_loaded(session)?;
        let table = session.table();
        let options = session.options();
        let context = session.context();
        let goals = business_goals.filter(|g| !g.trim().is_empty());

        let with_goals = |mut sections: Vec<(&'static str, String)>| {
            if let Some(goals) = goals {
                sections.push(("BUSINESS GOALS", goals.to_string()));
            }
            with_sections(&context, &sections)
        };

        let prompt = match kind {
            RecommendationKind::RevenueOptimization => {
                let data = with_goals(vec![
                    ("MENU ANALYSIS", to_json(&menu_performance(table, options)?)?),
                    ("STORE ANALYSIS", to_json(&store_performance(table, options)?)?),
                ]);
                RecommendationPrompt::RevenueOptimization {
                    analysis_summary: &data,
                }
                .render(&self.language)?
            }
            RecommendationKind::OperationalEfficiency => {
                let data = with_goals(vec![
                    ("STORE PERFORMANCE", to_json(&store_performance(table, options)?)?),
                    ("TRENDS", to_json(&trends(table)?)?),
                ]);
                RecommendationPrompt::OperationalEfficiency {
                    operational_data: &data,
                }
                .render(&self.language)?
            }
            RecommendationKind::MarketingStrategy => {
                let data = with_goals(vec![
                    ("CUSTOMER SEGMENTS", to_json(&segment_performance(table)?)?),
                    ("MENU PERFORMANCE", to_json(&menu_performance(table, options)?)?),
                ]);
                RecommendationPrompt::MarketingStrategy {
                    customer_sales_data: &data,
                }
                .render(&self.language)?
            }
            RecommendationKind::MenuStrategy => RecommendationPrompt::MenuStrategy {
                menu_data: &to_json(&menu_performance(table, options)?)?,
                segment_data: &to_json(&segment_performance(table)?)?,
                business_goals: goals,
            }
            .render(&self.language)?,
        };

        info!("Generating {:?} recommendations", kind);
        self.send(SystemRole::BusinessConsultant, prompt, RECOMMENDATION_TEMPERATURE)
            .await
    }

    /// Explain one analysis result together with the chart that shows it.
    pub async fn explain(&self, session: &Session, kind: AnalysisKind) -> Result<String> {
        ensure_loaded(session)?;
        let result = analysis_json(kind, session.table(), session.options())?;
        let chart = build_chart(
            ChartType::for_analysis(kind),
            session.table(),
            session.options(),
        )?;

        let analysis_result = format!("{}:\n{}", kind.title(), to_json(&result)?);
        let chart_description = chart.description();
        let prompt = ExplanationPrompt {
            analysis_result: &analysis_result,
            chart_description: Some(&chart_description),
        }
        .render(&self.language)?;

        info!("Explaining {}", kind.title());
        self.send(SystemRole::DataInterpreter, prompt, EXPLANATION_TEMPERATURE)
            .await
    }

    async fn send(&self, role: SystemRole, prompt: String, temperature: f32) -> Result<String> {
        let messages = [
            ChatMessage::system(role.prompt(&self.language)),
            ChatMessage::user(prompt),
        ];
        let options = self.options.with_temperature(temperature);
        self.backend.complete(&messages, &options).await
    }
}

fn ensure_loaded(session: &Session) -> Result<()> {
    if !session.is_loaded() {
        return Err(Error::Validation(
            "No data loaded; load a sales CSV first".to_string(),
        ));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn with_sections(context: &str, sections: &[(&str, String)]) -> String {
    let mut out = context.to_string();
    for (title, body) in sections {
        out.push_str(&format!("\n\n{}:\n{}", title, body));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::SCENARIO_CSV;
    use crate::data::loader::parse_csv;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed answer and records every request.
    struct MockBackend {
        reply: Option<String>,
        calls: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
    }

    impl MockBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn last_call(&self) -> (Vec<ChatMessage>, CompletionOptions) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: &CompletionOptions,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), *options));
            self.reply
                .clone()
                .ok_or_else(|| Error::Transport("Model API error 503: unavailable".to_string()))
        }
    }

    fn loaded_session() -> Session {
        let mut session = Session::default();
        session
            .load(&parse_csv(SCENARIO_CSV.as_bytes()).unwrap())
            .unwrap();
        session
    }

    fn copilot(backend: MockBackend) -> Copilot<MockBackend> {
        Copilot::new(backend, CompletionOptions::default(), "Indonesian")
    }

    #[tokio::test]
    async fn test_general_insight() {
        let copilot = copilot(MockBackend::replying("Insight"));
        let answer = copilot
            .generate_insight(&loaded_session(), InsightKind::General)
            .await
            .unwrap();
        assert_eq!(answer, "Insight");

        let (messages, options) = copilot.backend().last_call();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.ends_with("Respond in Indonesian."));
        assert!(messages[1].content.contains("Total Records: 3"));
        assert_eq!(options.temperature, INSIGHT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_focused_insight_uses_default_temperature() {
        let copilot = copilot(MockBackend::replying("ok"));
        copilot
            .generate_insight(&loaded_session(), InsightKind::MenuOptimization)
            .await
            .unwrap();

        let (messages, options) = copilot.backend().last_call();
        assert!(messages[1].content.contains("\"top_performers\""));
        assert_eq!(options.temperature, CompletionOptions::default().temperature);
    }

    #[tokio::test]
    async fn test_question_enriched_by_keywords() {
        let copilot = copilot(MockBackend::replying("Nasi Goreng"));
        let mut session = loaded_session();

        copilot
            .answer_question(&mut session, "Menu apa yang paling laris di outlet mana?")
            .await
            .unwrap();

        let (messages, options) = copilot.backend().last_call();
        let prompt = &messages[1].content;
        assert!(prompt.contains("MENU PERFORMANCE DATA"));
        assert!(prompt.contains("STORE PERFORMANCE DATA"));
        assert!(!prompt.contains("CUSTOMER SEGMENT DATA"));
        assert_eq!(options.temperature, QUESTION_TEMPERATURE);

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].answer, "Nasi Goreng");
    }

    #[tokio::test]
    async fn test_trend_question_uses_trend_prompt() {
        let copilot = copilot(MockBackend::replying("naik"));
        let mut session = loaded_session();
        copilot
            .answer_question(&mut session, "Bagaimana tren penjualan?")
            .await
            .unwrap();

        let (messages, _) = copilot.backend().last_call();
        assert!(messages[1].content.contains("The user asks about a trend"));
        assert!(messages[1].content.contains("SALES TRENDS"));
    }

    #[tokio::test]
    async fn test_failed_question_leaves_history_untouched() {
        let copilot = copilot(MockBackend::failing());
        let mut session = loaded_session();

        let err = copilot
            .answer_question(&mut session, "Siapa pelanggan terbaik?")
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(session.history().is_empty());
        assert_eq!(session.table().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_question_is_prompt_error() {
        let copilot = copilot(MockBackend::replying("x"));
        let mut session = loaded_session();
        let err = copilot.answer_question(&mut session, "  ").await.unwrap_err();
        assert!(matches!(err, Error::Prompt(_)));
        assert_eq!(copilot.backend().call_count(), 0);
    }

    #[tokio::test]
    async fn test_recommendations() {
        let copilot = copilot(MockBackend::replying("rec"));
        let session = loaded_session();

        copilot
            .recommend(&session, RecommendationKind::MenuStrategy, Some("naik 20%"))
            .await
            .unwrap();
        let (messages, options) = copilot.backend().last_call();
        assert!(messages[1].content.contains("Business goals: naik 20%"));
        assert_eq!(options.temperature, RECOMMENDATION_TEMPERATURE);

        copilot
            .recommend(&session, RecommendationKind::OperationalEfficiency, None)
            .await
            .unwrap();
        let (messages, _) = copilot.backend().last_call();
        assert!(messages[1].content.contains("STORE PERFORMANCE:"));
        assert!(!messages[1].content.contains("BUSINESS GOALS"));
    }

    #[tokio::test]
    async fn test_explain_includes_chart_description() {
        let copilot = copilot(MockBackend::replying("explained"));
        copilot
            .explain(&loaded_session(), AnalysisKind::Stores)
            .await
            .unwrap();

        let (messages, options) = copilot.backend().last_call();
        assert!(messages[1].content.contains("Store Performance:"));
        assert!(messages[1].content.contains("Store Performance Comparison"));
        assert_eq!(options.temperature, EXPLANATION_TEMPERATURE);
    }

    #[test]
    fn test_requires_loaded_session() {
        let copilot = copilot(MockBackend::replying("x"));
        let err = tokio_test::block_on(copilot.generate_insight(&Session::default(), InsightKind::General))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(copilot.backend().call_count(), 0);
    }
}
