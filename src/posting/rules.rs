use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};

use super::{Context, RuleFn};
use crate::{
    lexicon::Polarity,
    model::{ExtractedEntities, JournalEntry, Line, LineLabel, PaymentMethod},
};

const ACCOUNTS_PAYABLE: &str = "Accounts Payable";
const ACCOUNTS_RECEIVABLE: &str = "Accounts Receivable";
const SALES_TAX_PAYABLE: &str = "Sales Tax Payable";
const CASH: &str = "Cash";

/// Used when a sentence names no payment method at all.
const FALLBACK_METHOD: PaymentMethod = PaymentMethod::BankTransfer;

pub(super) fn registry() -> HashMap<&'static str, RuleFn> {
    let rules: [(&'static str, RuleFn); 12] = [
        ("sales", sales),
        ("purchase", purchase),
        ("lease_out", lease_out),
        ("lease_in", lease_in),
        ("investment", investment),
        ("fundraising", fundraising),
        ("repayment", repayment),
        ("receipts", receipts),
        ("payments", payments),
        ("other_receivables", other_receivables),
        ("other_payables", other_payables),
        ("fixed_pair", fixed_pair),
    ];

    rules.into_iter().collect()
}

fn counterpart(entities: &ExtractedEntities, index: usize) -> &'static str {
    entities
        .counterpart(index)
        .unwrap_or(FALLBACK_METHOD)
        .account_name()
}

fn counterpart_or<'a>(entities: &ExtractedEntities, index: usize, otherwise: &'a str) -> &'a str {
    entities
        .counterpart(index)
        .map(|m| m.account_name())
        .unwrap_or(otherwise)
}

/// One debit/credit pair per amount, accounts chosen by position.
fn each_amount<'a, F>(ctx: &Context<'a>, accounts: F) -> JournalEntry
where
    F: Fn(usize) -> (&'a str, &'a str),
{
    let lines = ctx
        .entities
        .amounts
        .iter()
        .enumerate()
        .flat_map(|(i, amount)| {
            let (debit, credit) = accounts(i);
            [
                Line::new(LineLabel::Debit(i + 1), debit, amount.clone()),
                Line::new(LineLabel::Credit(i + 1), credit, amount.clone()),
            ]
        })
        .collect();

    JournalEntry::new(&ctx.rule.type_id, lines)
}

fn sales(ctx: &Context<'_>) -> JournalEntry {
    let entities = ctx.entities;
    let mut lines = Vec::new();

    for (i, amount) in entities.amounts.iter().enumerate() {
        let n = i + 1;
        let debit = if entities.not_received {
            ACCOUNTS_RECEIVABLE
        } else {
            counterpart(entities, i)
        };
        let tax = if ctx.rule.taxable {
            ctx.taxes.tax_amount(amount, &entities.jurisdiction)
        } else {
            BigDecimal::zero()
        };

        lines.push(Line::new(LineLabel::Debit(n), debit, amount + &tax));
        lines.push(Line::new(
            LineLabel::Credit(n),
            &ctx.rule.main_account,
            amount.clone(),
        ));
        if !tax.is_zero() {
            lines.push(Line::new(LineLabel::CreditTax(n), SALES_TAX_PAYABLE, tax));
        }
    }

    JournalEntry::new(&ctx.rule.type_id, lines)
}

fn purchase(ctx: &Context<'_>) -> JournalEntry {
    let (rule, entities) = (ctx.rule, ctx.entities);
    each_amount(ctx, move |i| {
        let credit = if entities.not_paid {
            ACCOUNTS_PAYABLE
        } else {
            counterpart(entities, i)
        };
        (rule.main_account.as_str(), credit)
    })
}

fn lease_out(ctx: &Context<'_>) -> JournalEntry {
    let (rule, entities) = (ctx.rule, ctx.entities);
    each_amount(ctx, move |i| {
        (counterpart(entities, i), rule.main_account.as_str())
    })
}

fn lease_in(ctx: &Context<'_>) -> JournalEntry {
    purchase(ctx)
}

/// Unpaid investments are booked as a single payable for the total.
fn investment(ctx: &Context<'_>) -> JournalEntry {
    let (rule, entities) = (ctx.rule, ctx.entities);
    if entities.not_paid {
        let lines = if entities.amounts.is_empty() {
            Vec::new()
        } else {
            let total = entities.total();
            vec![
                Line::new(LineLabel::Debit(1), &rule.main_account, total.clone()),
                Line::new(LineLabel::Credit(1), ACCOUNTS_PAYABLE, total),
            ]
        };
        return JournalEntry::new(&rule.type_id, lines);
    }

    each_amount(ctx, move |i| {
        (rule.main_account.as_str(), counterpart(entities, i))
    })
}

fn fundraising(ctx: &Context<'_>) -> JournalEntry {
    lease_out(ctx)
}

fn repayment(ctx: &Context<'_>) -> JournalEntry {
    let rule = ctx.rule;
    let credit = rule.counterpart_account.as_deref().unwrap_or(CASH);
    each_amount(ctx, move |_| (rule.main_account.as_str(), credit))
}

fn receipts(ctx: &Context<'_>) -> JournalEntry {
    let (rule, entities) = (ctx.rule, ctx.entities);
    let otherwise = rule.counterpart_account.as_deref().unwrap_or(CASH);
    each_amount(ctx, move |i| {
        (
            counterpart_or(entities, i, otherwise),
            rule.main_account.as_str(),
        )
    })
}

fn payments(ctx: &Context<'_>) -> JournalEntry {
    let (rule, entities) = (ctx.rule, ctx.entities);
    let otherwise = rule.counterpart_account.as_deref().unwrap_or(CASH);
    each_amount(ctx, move |i| {
        (
            rule.main_account.as_str(),
            counterpart_or(entities, i, otherwise),
        )
    })
}

fn other_receivables(ctx: &Context<'_>) -> JournalEntry {
    let rule = ctx.rule;
    let debit = rule.counterpart_account.as_deref().unwrap_or(CASH);
    each_amount(ctx, move |_| (debit, rule.main_account.as_str()))
}

fn other_payables(ctx: &Context<'_>) -> JournalEntry {
    repayment(ctx)
}

/// The main account sits on the side its polarity names, against the
/// configured counterpart.
fn fixed_pair(ctx: &Context<'_>) -> JournalEntry {
    let rule = ctx.rule;
    let main = rule.main_account.as_str();
    let other = rule.counterpart_account.as_deref().unwrap_or(CASH);
    each_amount(ctx, move |_| match rule.polarity {
        Polarity::Debit => (main, other),
        Polarity::Credit => (other, main),
    })
}
