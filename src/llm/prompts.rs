//! Prompt templates.
//!
//! Each prompt kind is a struct or enum variant holding its named fields, and
//! rendering fails with [`Error::Prompt`] when a required field is empty.
//! Every rendered prompt ends with an instruction to answer in the
//! configured response language.

use crate::error::{Error, Result};

/// A prompt that can be rendered into user-message text.
pub trait PromptTemplate {
    fn render(&self, language: &str) -> Result<String>;
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::Prompt(format!("missing required field '{}'", field)));
    }
    Ok(value)
}

fn language_line(language: &str) -> String {
    format!("Respond in {}.", language)
}

/// Persona used as the system message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRole {
    DataAnalyst,
    BusinessConsultant,
    QaAssistant,
    DataInterpreter,
}

impl SystemRole {
    pub fn prompt(&self, language: &str) -> String {
        let body = match self {
            SystemRole::DataAnalyst => {
                "You are a senior data analyst specialising in the Food & Beverage industry, \
                 with expertise in sales and trend analysis, customer segmentation, menu \
                 optimisation and pricing, and operational efficiency for restaurant chains.\n\
                 Give insights that are actionable, specific, grounded in the data provided \
                 and relevant for decision making."
            }
            SystemRole::BusinessConsultant => {
                "You are an experienced business consultant for the F&B industry. You \
                 understand market dynamics, consumer behaviour and the operational \
                 challenges of restaurant chains.\n\
                 Focus on recommendations that are practical to implement, cost-effective \
                 and realistic about resource constraints."
            }
            SystemRole::QaAssistant => {
                "You are an assistant that helps users understand their F&B sales data. \
                 Answer specific questions, explain trends and patterns, and put numbers \
                 in context.\n\
                 Always answer from the data available, state its limits when it is not \
                 enough, and give concrete examples."
            }
            SystemRole::DataInterpreter => {
                "You are a data interpreter who explains analysis results in plain \
                 language for business stakeholders."
            }
        };
        format!("{}\n{}", body, language_line(language))
    }
}

/// Structured analysis of one aspect of the data.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPrompt<'a> {
    SalesTrend { data_summary: &'a str },
    MenuOptimization { menu_data: &'a str },
    CustomerSegmentation { segment_data: &'a str },
    StorePerformance { store_data: &'a str },
}

impl PromptTemplate for AnalysisPrompt<'_> {
    fn render(&self, language: &str) -> Result<String> {
        let body = match self {
            AnalysisPrompt::SalesTrend { data_summary } => format!(
                "Analyse the following F&B sales data and describe the sales trends.\n\n\
                 Data summary:\n{}\n\n\
                 Focus on:\n\
                 1. Daily, weekly and monthly sales trends\n\
                 2. Seasonal patterns\n\
                 3. Growth rate and momentum\n\
                 4. Notable anomalies or outliers\n\n\
                 Structure the answer as Key Findings (3-4 points), Business Implications \
                 and Recommended Actions.",
                required("data_summary", data_summary)?
            ),
            AnalysisPrompt::MenuOptimization { menu_data } => format!(
                "Based on the following menu performance data:\n\n{}\n\n\
                 Analyse:\n\
                 1. Menu items with the highest and lowest return\n\
                 2. Underperforming versus overperforming items\n\
                 3. Pricing opportunities\n\
                 4. Menu mix optimisation\n\n\
                 Recommend which items to promote, which to re-price, which to retire, \
                 and where new items could fill a gap.",
                required("menu_data", menu_data)?
            ),
            AnalysisPrompt::CustomerSegmentation { segment_data } => format!(
                "Analyse the customer segments in the following data:\n\n{}\n\n\
                 Describe:\n\
                 1. The characteristics of each segment\n\
                 2. Value contribution per segment\n\
                 3. Visible behaviour patterns\n\
                 4. Growth opportunities per segment\n\n\
                 Recommend a marketing approach, pricing, menu targeting and retention \
                 tactics for each segment.",
                required("segment_data", segment_data)?
            ),
            AnalysisPrompt::StorePerformance { store_data } => format!(
                "Evaluate the performance of the outlets based on:\n\n{}\n\n\
                 Analyse:\n\
                 1. Store ranking across the available metrics\n\
                 2. Best performing versus underperforming stores\n\
                 3. Factors driving the differences\n\
                 4. Consistency across locations\n\n\
                 Recommend which stores need attention, which practices to copy from the \
                 top performers, and how to allocate resources.",
                required("store_data", store_data)?
            ),
        };
        Ok(format!("{}\n\n{}", body, language_line(language)))
    }
}

/// A user question with the data it should be answered from.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionPrompt<'a> {
    General {
        question: &'a str,
        data_context: &'a str,
    },
    Comparison {
        question: &'a str,
        comparison_data: &'a str,
    },
    Trend {
        question: &'a str,
        trend_data: &'a str,
    },
}

impl PromptTemplate for QuestionPrompt<'_> {
    fn render(&self, language: &str) -> Result<String> {
        let body = match self {
            QuestionPrompt::General {
                question,
                data_context,
            } => format!(
                "The user asks about their F&B data:\n\"{}\"\n\n\
                 Data context:\n{}\n\n\
                 Answer with specific figures from the data, a clear explanation, concrete \
                 examples where relevant, and mention any limits of the data.",
                required("question", question)?,
                required("data_context", data_context)?
            ),
            QuestionPrompt::Comparison {
                question,
                comparison_data,
            } => format!(
                "The user wants to compare:\n\"{}\"\n\n\
                 Data for the comparison:\n{}\n\n\
                 Give a clear, objective comparison with the relevant metrics, context for \
                 interpreting them, and what the differences suggest.",
                required("question", question)?,
                required("comparison_data", comparison_data)?
            ),
            QuestionPrompt::Trend {
                question,
                trend_data,
            } => format!(
                "The user asks about a trend:\n\"{}\"\n\n\
                 Trend data:\n{}\n\n\
                 Explain the visible pattern, possible causes, what it means for the \
                 business and what it implies going forward.",
                required("question", question)?,
                required("trend_data", trend_data)?
            ),
        };
        Ok(format!("{}\n\n{}", body, language_line(language)))
    }
}

/// Strategic recommendations.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationPrompt<'a> {
    RevenueOptimization {
        analysis_summary: &'a str,
    },
    OperationalEfficiency {
        operational_data: &'a str,
    },
    MarketingStrategy {
        customer_sales_data: &'a str,
    },
    MenuStrategy {
        menu_data: &'a str,
        segment_data: &'a str,
        business_goals: Option<&'a str>,
    },
}

impl PromptTemplate for RecommendationPrompt<'_> {
    fn render(&self, language: &str) -> Result<String> {
        let body = match self {
            RecommendationPrompt::RevenueOptimization { analysis_summary } => format!(
                "Based on this sales analysis:\n{}\n\n\
                 Recommend strategies to increase revenue:\n\n\
                 1. SHORT TERM (1-3 months): quick wins that can be implemented now\n\
                 2. MEDIUM TERM (3-6 months): strategic initiatives and process improvements\n\
                 3. LONG TERM (6+ months): structural changes and investment opportunities\n\n\
                 Prioritise by expected impact, implementation difficulty and resource \
                 requirements.",
                required("analysis_summary", analysis_summary)?
            ),
            RecommendationPrompt::OperationalEfficiency { operational_data } => format!(
                "The operational data shows:\n{}\n\n\
                 Recommend improvements for:\n\n\
                 INVENTORY MANAGEMENT: stock levels per outlet, demand forecasting\n\
                 STAFFING & OPERATIONS: peak hours, service efficiency\n\
                 COST OPTIMISATION: food cost, operating cost\n\
                 QUALITY CONTROL: consistency across outlets, customer satisfaction",
                required("operational_data", operational_data)?
            ),
            RecommendationPrompt::MarketingStrategy {
                customer_sales_data,
            } => format!(
                "Customer and sales data:\n{}\n\n\
                 Propose a marketing strategy covering:\n\n\
                 CUSTOMER ACQUISITION: target profiles, channels\n\
                 CUSTOMER RETENTION: loyalty programs, personalisation\n\
                 PROMOTION: which menu items to promote, timing and targeting\n\
                 BRAND POSITIONING: value proposition per segment, differentiation",
                required("customer_sales_data", customer_sales_data)?
            ),
            RecommendationPrompt::MenuStrategy {
                menu_data,
                segment_data,
                business_goals,
            } => format!(
                "Based on this menu performance:\n{}\n\n\
                 And this customer behaviour:\n{}\n\n\
                 Business goals: {}\n\n\
                 Recommend a menu strategy, including:\n\
                 1. Menu items to promote\n\
                 2. Pricing strategy\n\
                 3. Menu innovation opportunities\n\
                 4. Items to review or retire",
                required("menu_data", menu_data)?,
                required("segment_data", segment_data)?,
                business_goals
                    .filter(|g| !g.trim().is_empty())
                    .unwrap_or("not specified")
            ),
        };
        Ok(format!("{}\n\n{}", body, language_line(language)))
    }
}

/// Broad insight over the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightPrompt<'a> {
    pub data_summary: &'a str,
}

impl PromptTemplate for InsightPrompt<'_> {
    fn render(&self, language: &str) -> Result<String> {
        Ok(format!(
            "Based on the following F&B sales data:\n\n{}\n\n\
             Give in-depth insight into:\n\
             1. The visible sales trends\n\
             2. The best and worst performing menu items\n\
             3. The most profitable customer segments\n\
             4. Strategic recommendations to increase revenue\n\n\
             Format the answer as clear, actionable bullet points.\n\n{}",
            required("data_summary", self.data_summary)?,
            language_line(language)
        ))
    }
}

/// Plain-language explanation of an analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationPrompt<'a> {
    pub analysis_result: &'a str,
    pub chart_description: Option<&'a str>,
}

impl PromptTemplate for ExplanationPrompt<'_> {
    fn render(&self, language: &str) -> Result<String> {
        let mut prompt = format!(
            "Analysis result:\n{}\n\n",
            required("analysis_result", self.analysis_result)?
        );
        if let Some(chart) = self.chart_description.filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("Chart description:\n{}\n\n", chart));
        }
        prompt.push_str(
            "Explain in natural language what this result means and what it implies \
             for the business.\n\n",
        );
        prompt.push_str(&language_line(language));
        Ok(prompt)
    }
}
