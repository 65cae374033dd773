use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::backend::{InvestorClient, PaymentMethod, Session, WithdrawalFrequency};

pub const DEFAULT_BACKEND_URL: &str = "https://backend.aadyanviwealth.com";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliWithdrawalFrequency {
    Quarterly,
    Annual,
    Maturity,
}

impl From<CliWithdrawalFrequency> for WithdrawalFrequency {
    fn from(value: CliWithdrawalFrequency) -> Self {
        match value {
            CliWithdrawalFrequency::Quarterly => WithdrawalFrequency::Quarterly,
            CliWithdrawalFrequency::Annual => WithdrawalFrequency::Annual,
            CliWithdrawalFrequency::Maturity => WithdrawalFrequency::Maturity,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPaymentMethod {
    Upi,
    Neft,
}

impl From<CliPaymentMethod> for PaymentMethod {
    fn from(value: CliPaymentMethod) -> Self {
        match value {
            CliPaymentMethod::Upi => PaymentMethod::Upi,
            CliPaymentMethod::Neft => PaymentMethod::Neft,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "investdesk",
    about = "Investor dashboard companion: early-withdrawal previews and backend requests"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "INVESTDESK_BACKEND_URL",
        default_value = DEFAULT_BACKEND_URL,
        help = "Base URL of the investor backend"
    )]
    pub backend_url: String,
    #[arg(
        long,
        global = true,
        env = "INVESTDESK_SESSION_COOKIE",
        hide_env_values = true,
        help = "Session cookie forwarded to the backend, e.g. 'token=...'"
    )]
    pub session_cookie: Option<String>,
    #[arg(
        long,
        global = true,
        env = "INVESTDESK_LOG_JSON",
        help = "Emit logs as JSON lines"
    )]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn session(&self) -> Session {
        match &self.session_cookie {
            Some(cookie) => Session::with_cookie(cookie.clone()),
            None => Session::anonymous(),
        }
    }

    pub fn client(&self) -> InvestorClient {
        InvestorClient::new(self.backend_url.clone(), self.session())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the withdrawal preview API
    Serve {
        #[arg(long, env = "INVESTDESK_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Preview an early withdrawal from explicit plan parameters
    Estimate(EstimateArgs),
    /// Show invested amount, current value and profit/loss
    Overview,
    /// List the investment plans on offer
    Plans,
    /// List the caller's investments
    Investments,
    /// List the caller's fund transactions
    Transactions,
    /// Preview an early withdrawal of one of the caller's investments
    Quote {
        investment_id: u64,
        #[arg(long, help = "Quote as of this date (YYYY-MM-DD), defaults to today")]
        as_of: Option<NaiveDate>,
    },
    /// Quote, confirm and submit a pre-maturity withdrawal
    Withdraw {
        investment_id: u64,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    /// Subscribe to a lump-sum investment plan
    Subscribe {
        #[arg(long)]
        plan_id: u64,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, value_enum, default_value_t = CliWithdrawalFrequency::Quarterly)]
        withdrawal_frequency: CliWithdrawalFrequency,
    },
    /// Record a deposit made by UPI or NEFT
    AddFunds {
        #[arg(long)]
        amount: Decimal,
        #[arg(long, value_enum, default_value_t = CliPaymentMethod::Upi)]
        payment_method: CliPaymentMethod,
        #[arg(long)]
        reference: String,
        #[arg(long)]
        comments: Option<String>,
    },
    /// Request a withdrawal of available funds
    WithdrawFunds {
        #[arg(long)]
        amount: Decimal,
    },
}

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    #[arg(long, help = "Amount invested")]
    pub principal: Decimal,
    #[arg(long, help = "Nominal annual return in percent, e.g. 12")]
    pub annual_rate: Decimal,
    #[arg(long, help = "Lock-in term in days")]
    pub term_days: u32,
    #[arg(long, help = "Date the investment began (YYYY-MM-DD)")]
    pub investment_date: NaiveDate,
    #[arg(long, help = "Quote as of this date (YYYY-MM-DD), defaults to today")]
    pub as_of: Option<NaiveDate>,
}
