use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use chrono::Local;
use rust_decimal::Decimal;

use crate::api::run_http_server;
use crate::backend::{
    AddFundsRequest, InvestmentRecord, InvestorClient, PortfolioSummary,
    SubscribeInvestmentRequest, WithdrawFundsRequest,
};
use crate::config::{Cli, Command, EstimateArgs};
use crate::core::{
    InvestmentPosition, WithdrawalQuote, estimate, estimate_today, format_inr, round_amount,
};
use crate::flow::WithdrawalFlow;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = cli.client();
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .with_context(|| format!("preview API on port {port} stopped")),
        Command::Estimate(args) => estimate_command(&args),
        Command::Overview => {
            let summary = client.portfolio_summary().await?;
            print!("{}", render_overview(&summary));
            Ok(())
        }
        Command::Plans => plans_command(&client).await,
        Command::Investments => investments_command(&client).await,
        Command::Transactions => transactions_command(&client).await,
        Command::Quote {
            investment_id,
            as_of,
        } => {
            let (_, position) = client.position_for(investment_id).await?;
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let quote = estimate(&position, as_of).context("unable to estimate withdrawal")?;
            print!("{}", render_quote(&quote));
            Ok(())
        }
        Command::Withdraw { investment_id, yes } => {
            withdraw_command(client, investment_id, yes).await
        }
        Command::Subscribe {
            plan_id,
            amount,
            withdrawal_frequency,
        } => {
            let plans = client.investment_plans().await?;
            let Some(plan) = plans.iter().find(|plan| plan.id == plan_id) else {
                bail!("Selected plan not found.");
            };
            let request =
                SubscribeInvestmentRequest::for_plan(plan, amount, withdrawal_frequency.into())?;
            let response = client.subscribe_investment(&request).await?;
            println!("{}", response.message);
            Ok(())
        }
        Command::AddFunds {
            amount,
            payment_method,
            reference,
            comments,
        } => {
            let request = AddFundsRequest::new(
                payment_method.into(),
                amount,
                &reference,
                comments.as_deref(),
            )?;
            let response = client.add_funds(&request).await?;
            println!("{}", non_empty_or(&response.message, "Funds added successfully!"));
            Ok(())
        }
        Command::WithdrawFunds { amount } => {
            let request = WithdrawFundsRequest::new(amount)?;
            let response = client.withdraw_funds(&request).await?;
            println!(
                "{}",
                non_empty_or(&response.message, "Withdrawal request submitted!")
            );
            Ok(())
        }
    }
}

fn estimate_command(args: &EstimateArgs) -> anyhow::Result<()> {
    let position = InvestmentPosition {
        principal: args.principal,
        investment_date: args.investment_date,
        annual_rate_percent: args.annual_rate,
        lock_in_term_days: args.term_days,
    };
    let quote = match args.as_of {
        Some(as_of) => estimate(&position, as_of),
        None => estimate_today(&position),
    }
    .context("unable to estimate withdrawal")?;
    print!("{}", render_quote(&quote));
    Ok(())
}

async fn plans_command(client: &InvestorClient) -> anyhow::Result<()> {
    for plan in client.investment_plans().await? {
        println!(
            "{:>5}  {:<28} min {:>16}  return {:<10} term {:<10} {:?}/{:?}",
            plan.id,
            plan.name,
            format_inr(plan.min_investment),
            plan.expected_return,
            plan.investment_term,
            plan.plan_type,
            plan.status,
        );
    }
    Ok(())
}

async fn investments_command(client: &InvestorClient) -> anyhow::Result<()> {
    for inv in client.investments().await? {
        println!("{}", render_investment(&inv));
    }
    Ok(())
}

async fn transactions_command(client: &InvestorClient) -> anyhow::Result<()> {
    for tx in client.transactions().await? {
        println!(
            "{:<10} {:<20} {:<10} {:>16} {:<6} {:<12} {}",
            tx.id,
            tx.date,
            tx.kind,
            format_inr(tx.amount),
            tx.method.as_deref().unwrap_or("-"),
            tx.ref_no.as_deref().unwrap_or("-"),
            tx.remark.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn withdraw_command(
    client: InvestorClient,
    investment_id: u64,
    skip_prompt: bool,
) -> anyhow::Result<()> {
    let (_, position) = client.position_for(investment_id).await?;
    let flow = WithdrawalFlow::new(client);
    let quote = flow.request_estimate(investment_id, &position, Local::now().date_naive())?;
    print!("{}", render_quote(&quote));

    if !skip_prompt && !prompt_confirmation(investment_id)? {
        flow.cancel();
        println!("Withdrawal cancelled.");
        return Ok(());
    }

    let receipt = flow.confirm().await?;
    println!("{}", non_empty_or(&receipt.message, "Withdrawal submitted."));
    if let Some(payout) = receipt.payout_amount {
        println!("Payout confirmed by backend: {}", format_inr(payout));
    }
    Ok(())
}

fn prompt_confirmation(investment_id: u64) -> anyhow::Result<bool> {
    print!("Withdraw investment {investment_id} before maturity? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES" | "Yes"))
}

fn non_empty_or<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}

fn render_investment(inv: &InvestmentRecord) -> String {
    format!(
        "{:>5}  plan {:<5} {:>16}  since {:<24} matures {:<24} {:?}",
        inv.id,
        inv.investment_plan_id,
        format_inr(inv.invested_amount),
        inv.investment_date,
        inv.maturity_date.as_deref().unwrap_or("-"),
        inv.investment_mode,
    )
}

fn render_overview(summary: &PortfolioSummary) -> String {
    let profit_loss = summary.profit_loss();
    let label = if profit_loss < Decimal::ZERO {
        "Loss:"
    } else {
        "Profit:"
    };
    format!(
        "Total invested:   {}\n\
         Current value:    {}\n\
         {label:<18}{}\n",
        format_inr(summary.total_invested),
        format_inr(summary.current_value),
        format_inr(profit_loss),
    )
}

/// Human-readable preview. Says plainly that the backend sets the real payout.
pub fn render_quote(quote: &WithdrawalQuote) -> String {
    let penalty_line = if quote.is_penalty_free() {
        "Penalty:          none (stage 4)".to_string()
    } else {
        format!(
            "Penalty:          {}% of gain (stage {}) = {}",
            quote.penalty_percent,
            quote.stage_achieved,
            format_inr(quote.penalty_amount)
        )
    };
    format!(
        "Withdrawal preview as of {}\n\
         Elapsed:          {} days ({}% of lock-in)\n\
         Principal:        {}\n\
         Accrued gain:     {}\n\
         {penalty_line}\n\
         Estimated payout: {}\n\
         The final amount is set by the backend when the withdrawal is processed.\n",
        quote.as_of_date,
        quote.elapsed_days,
        round_amount(quote.elapsed_percent),
        format_inr(quote.principal),
        format_inr(quote.accrued_gain),
        format_inr(quote.net_payout),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn position() -> InvestmentPosition {
        InvestmentPosition {
            principal: dec!(100000),
            investment_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("date"),
            annual_rate_percent: dec!(12),
            lock_in_term_days: 365,
        }
    }

    #[test]
    fn render_quote_shows_stage_penalty_and_provisional_payout() {
        let as_of = NaiveDate::from_ymd_opt(2023, 4, 11).expect("date");
        let text = render_quote(&estimate(&position(), as_of).expect("quote"));

        assert!(text.contains("Elapsed:          100 days (27.40% of lock-in)"));
        assert!(text.contains("Penalty:          3.5% of gain (stage 2) = ₹115.07"));
        assert!(text.contains("Estimated payout: ₹1,03,172.60"));
        assert!(text.contains("set by the backend"));
    }

    #[test]
    fn render_quote_marks_penalty_free_stage() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
        let text = render_quote(&estimate(&position(), as_of).expect("quote"));
        assert!(text.contains("Penalty:          none (stage 4)"));
    }

    #[test]
    fn render_overview_labels_profit_and_loss() {
        let gain = render_overview(&PortfolioSummary {
            total_invested: dec!(105000),
            current_value: dec!(112500.75),
        });
        assert!(gain.contains("Total invested:   ₹1,05,000.00"));
        assert!(gain.contains("Current value:    ₹1,12,500.75"));
        assert!(gain.contains("Profit:           ₹7,500.75"));

        let loss = render_overview(&PortfolioSummary {
            total_invested: dec!(50000),
            current_value: dec!(48250.40),
        });
        assert!(loss.contains("Loss:             -₹1,749.60"));
    }

    #[test]
    fn non_empty_or_falls_back_on_blank_message() {
        assert_eq!(non_empty_or("  ", "fallback"), "fallback");
        assert_eq!(non_empty_or("done", "fallback"), "done");
    }
}
