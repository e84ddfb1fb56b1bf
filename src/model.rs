use serde::{
    ser::{SerializeMap, SerializeStruct},
    Deserialize, Serialize,
};

pub use anyhow::Result;
pub use bigdecimal::{BigDecimal, RoundingMode, Zero};
pub use itertools::Itertools;

/// Type id given to sentences nothing in the lexicon recognized.
pub const UNKNOWN_TYPE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    CreditCard,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Other => "other",
        }
    }

    /// Name of the account a payment through this method posts against.
    pub fn account_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Cheque => "Cheque",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::Other => "Other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Everything pulled out of a single sentence. Payment methods are kept in
/// order of first mention, without duplicates, because posting pairs them
/// with amounts by position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntities {
    pub amounts: Vec<BigDecimal>,
    pub payment_methods: Vec<PaymentMethod>,
    pub jurisdiction: String,
    pub not_received: bool,
    pub not_paid: bool,
    pub transaction_type: String,
}

impl ExtractedEntities {
    pub fn new(default_jurisdiction: &str) -> Self {
        Self {
            amounts: Vec::default(),
            payment_methods: Vec::default(),
            jurisdiction: default_jurisdiction.to_owned(),
            not_received: false,
            not_paid: false,
            transaction_type: UNKNOWN_TYPE.to_owned(),
        }
    }

    /// The method paired with the amount at `index`, falling back to the
    /// first method mentioned.
    pub fn counterpart(&self, index: usize) -> Option<PaymentMethod> {
        self.payment_methods
            .get(index)
            .or_else(|| self.payment_methods.first())
            .copied()
    }

    pub fn total(&self) -> BigDecimal {
        self.amounts.iter().cloned().sum()
    }

    pub fn is_unknown(&self) -> bool {
        self.transaction_type == UNKNOWN_TYPE
    }

    /// The same entities with every amount rounded to cents, so lines built
    /// from them render exactly as they are totalled.
    pub fn rounded(&self) -> Self {
        Self {
            amounts: self.amounts.iter().map(round_cents).collect(),
            ..self.clone()
        }
    }
}

impl Serialize for ExtractedEntities {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let amounts = self.amounts.iter().map(format_amount).collect::<Vec<_>>();
        let mut state = serializer.serialize_struct("ExtractedEntities", 6)?;
        state.serialize_field("transaction_type", &self.transaction_type)?;
        state.serialize_field("amounts", &amounts)?;
        state.serialize_field("payment_methods", &self.payment_methods)?;
        state.serialize_field("jurisdiction", &self.jurisdiction)?;
        state.serialize_field("not_received", &self.not_received)?;
        state.serialize_field("not_paid", &self.not_paid)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Debit,
    Credit,
}

/// Labels are numbered from 1, one number per extracted amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLabel {
    Debit(usize),
    Credit(usize),
    CreditTax(usize),
}

impl LineLabel {
    pub fn side(&self) -> Side {
        match self {
            LineLabel::Debit(_) => Side::Debit,
            LineLabel::Credit(_) | LineLabel::CreditTax(_) => Side::Credit,
        }
    }
}

impl std::fmt::Display for LineLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineLabel::Debit(n) => f.pad(&format!("Debit_{}", n)),
            LineLabel::Credit(n) => f.pad(&format!("Credit_{}", n)),
            LineLabel::CreditTax(n) => f.pad(&format!("Credit_Tax_{}", n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: LineLabel,
    pub account: String,
    pub amount: BigDecimal,
}

impl Line {
    pub fn new(label: LineLabel, account: &str, amount: BigDecimal) -> Self {
        Self {
            label,
            account: account.to_owned(),
            amount,
        }
    }

    pub fn side(&self) -> Side {
        self.label.side()
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("{} {}", self.account, format_amount(&self.amount)))
    }
}

/// The postings generated for one sentence, in the order the rule emitted
/// them. Entries are built whole and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    transaction_type: String,
    lines: Vec<Line>,
}

impl JournalEntry {
    pub fn new(transaction_type: &str, lines: Vec<Line>) -> Self {
        Self {
            transaction_type: transaction_type.to_owned(),
            lines,
        }
    }

    pub fn transaction_type(&self) -> &str {
        &self.transaction_type
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The rendered posting for a label such as `Credit_Tax_1`.
    pub fn get(&self, label: &str) -> Option<String> {
        self.lines
            .iter()
            .find(|l| l.label.to_string() == label)
            .map(|l| l.to_string())
    }

    pub fn rendered(&self) -> Vec<(String, String)> {
        self.lines
            .iter()
            .map(|l| (l.label.to_string(), l.to_string()))
            .collect()
    }

    pub fn total(&self, side: Side) -> BigDecimal {
        self.lines
            .iter()
            .filter(|l| l.side() == side)
            .map(|l| l.amount.clone())
            .sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total(Side::Debit) == self.total(Side::Credit)
    }
}

impl Serialize for JournalEntry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for line in self.lines.iter() {
            map.serialize_entry(&line.label.to_string(), &line.to_string())?;
        }
        map.end()
    }
}

impl std::fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self
            .lines
            .iter()
            .map(|l| format!("{}: {}", l.label, l))
            .join(", ");
        f.pad(&format!("{{{}}}", text))
    }
}

/// Half to even.
pub fn round_cents(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfEven)
}

/// Cents, without trailing zeros: `500`, `536.25`, `214.5`.
pub fn format_amount(value: &BigDecimal) -> String {
    let text = round_cents(value).to_string();
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text
    }
}
