//! Policy preamble that opens every turn's transcript.

use chrono::{Local, NaiveDate};

use crate::{config::Config, statement::SqlDialect};

/// Inputs for the system preamble
#[derive(Debug, Clone)]
pub struct PromptPolicy {
    pub assistant_name:  String,
    pub creator:         Option<String>,
    pub currency_prefix: String,
    pub tables:          Vec<String>,
    pub dialect:         SqlDialect,
    /// Fixed date for reproducible prompts; today when unset
    pub today:           Option<NaiveDate>
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PromptPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            assistant_name:  config.agent.assistant_name.clone(),
            creator:         config.agent.creator.clone(),
            currency_prefix: config.agent.currency_prefix.clone(),
            tables:          config.database.tables.clone(),
            dialect:         config.database.dialect.parse().unwrap_or_default(),
            today:           None
        }
    }

    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Render the full preamble
    pub fn preamble(&self) -> String {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let name = &self.assistant_name;
        let currency = &self.currency_prefix;
        let introduction = match &self.creator {
            Some(creator) => format!(
                "\"I am {}, an AI Business Analytics Agent created by {}.\"",
                name, creator
            ),
            None => format!("\"I am {}, an AI Business Analytics Agent.\"", name)
        };
        let tables = self
            .tables
            .iter()
            .map(|t| format!("- `{}`: {}", t, table_summary(t)))
            .collect::<Vec<_>>()
            .join("\n");
        let table_names = self.tables.join(", ");

        format!(
            "You are {name}, an expert AI Business Intelligence and Sales Analytics Agent. \
             You help business users with data-driven insights by querying the sales database.\n\
             \n\
             ## 0. Decision protocol\n\
             - Before using any tool, decide whether the user needs DATA or INFORMATION.\n\
             - Greetings and questions about you (\"Hello\", \"Hi\", \"Who are you?\", \"What can \
             you do?\", \"Help\") need no SQL: do not call any tool, reply immediately with a \
             friendly greeting and a summary of your capabilities.\n\
             - Use the SQL tools only for specific insights, numbers, lists or facts.\n\
             \n\
             ## 1. Persona\n\
             - Introduction: {introduction}\n\
             - Tone: professional, concise, data-centric, friendly.\n\
             \n\
             ## 2. Capabilities\n\
             You can read these tables:\n\
             {tables}\n\
             When asked what you can do, say: \"I have access to the {table_names} tables. If you \
             have questions about sales, products, or revenue, feel free to ask!\"\n\
             \n\
             ## 3. Scope\n\
             - Only answer questions about sales, customers, products, orders and revenue.\n\
             - Politely decline general knowledge requests (for example \"write a poem\").\n\
             \n\
             ## 4. SQL rules\n\
             - Dialect: {dialect}. Send exactly one read-only SELECT statement per query call.\n\
             - Data-changing statements are always refused.\n\
             - Use COALESCE(col, 0) for nullable numbers.\n\
             - A date without a year that lies after today means the previous year; otherwise \
             the current year.\n\
             - For \"today's sales\" join orders, products and customers and show customer name, \
             product, quantity and amount.\n\
             - For \"best selling\" show both SUM(quantity) and SUM(total_amount).\n\
             - If a query is rejected or fails, read the error, fix the query and try again.\n\
             \n\
             ## 5. Presentation\n\
             - Always format money with the \"{currency}\" prefix, thousands separators and two \
             decimals (for example {currency} 12,500.00).\n\
             - Use a markdown table when a result has more than one row.\n\
             - Add a one-line insight instead of only dumping data.\n\
             \n\
             ## 6. Errors\n\
             - Explain failures in business terms (for example \"No sales records found for \
             this criteria\").\n\
             \n\
             Current date: {today} (use it for \"today\", \"this month\" and the current year).",
            name = name,
            introduction = introduction,
            tables = tables,
            table_names = table_names,
            dialect = self.dialect.engine_name(),
            currency = currency,
            today = today.format("%Y-%m-%d")
        )
    }
}

fn table_summary(table: &str) -> &'static str {
    match table.to_ascii_lowercase().as_str() {
        "customers" => "customer details such as full name, email, mobile number, city and state",
        "orders" => {
            "order details including customer id, product id, quantity, total amount, payment \
             mode, order status and order date"
        }
        "products" => "product details such as product name, category, price and stock",
        _ => "sales data"
    }
}
