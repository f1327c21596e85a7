//! Core document entity and workflow vocabulary types
use crate::error::WorkflowError;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// The two payment document kinds tracked by the workflow. They share one
/// shape and lifecycle; the kind only scopes the numbering sequence.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    #[n(0)]
    Voucher,
    #[n(1)]
    Form,
}

impl DocumentKind {
    // tag used in sequence counter keys, one independent counter per kind
    pub(crate) fn key_tag(&self) -> &'static str {
        match self {
            DocumentKind::Voucher => "pv",
            DocumentKind::Form => "pf",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Voucher => write!(f, "Payment Voucher"),
            DocumentKind::Form => write!(f, "Payment Form"),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    #[n(0)]
    Draft,
    #[n(1)]
    PendingL2,
    #[n(2)]
    PendingL3,
    #[n(3)]
    PendingL4,
    #[n(4)]
    PendingL5,
    #[n(5)]
    OnRevision,
    #[n(6)]
    Approved,
    #[n(7)]
    Rejected,
}

impl Status {
    /// Role level an approver must hold to act at this status.
    /// `None` for statuses with no pending reviewer.
    pub fn required_level(&self) -> Option<u8> {
        match self {
            Status::PendingL2 => Some(2),
            Status::PendingL3 => Some(3),
            Status::PendingL4 => Some(4),
            Status::PendingL5 => Some(5),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.required_level().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::Draft => "Draft",
            Status::PendingL2 => "Pending Account Supervisor",
            Status::PendingL3 => "Pending Finance Manager",
            Status::PendingL4 => "Pending General Manager",
            Status::PendingL5 => "Pending Managing Director",
            Status::OnRevision => "On Revision",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
        };
        write!(f, "{label}")
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    #[n(0)]
    Submit,
    #[n(1)]
    Approve,
    #[n(2)]
    Reject,
    #[n(3)]
    Return,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Submit => write!(f, "submit"),
            Action::Approve => write!(f, "approve"),
            Action::Reject => write!(f, "reject"),
            Action::Return => write!(f, "return"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Calendar date a payment is due. Document numbers derive their `YYMM`
/// prefix from this date, never from the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PaymentDate(NaiveDate);

impl PaymentDate {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
    /// Two-digit year and zero-padded month, e.g. `2601` for January 2026.
    pub fn month_code(&self) -> String {
        self.0.format("%y%m").to_string()
    }
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for PaymentDate {
    fn from(value: NaiveDate) -> Self {
        PaymentDate(value)
    }
}

impl<C> minicbor::Encode<C> for PaymentDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for PaymentDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(PaymentDate)
            .ok_or(minicbor::decode::Error::message(
                "day count out of range for a calendar date",
            ))
    }
}

/// A payment document moving through the approval chain. Status, number and
/// current approver are mutated only by the workflow service.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub kind: DocumentKind,
    #[n(2)]
    pub number: Option<String>,
    #[n(3)]
    pub status: Status,
    #[n(4)]
    pub payee_name: String,
    #[n(5)]
    pub amount: u64,
    #[n(6)]
    pub payment_date: PaymentDate,
    #[n(7)]
    pub created_by: String,
    #[n(8)]
    pub current_approver: Option<String>,
    #[n(9)]
    pub requires_elevated_approval: bool,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
    #[n(11)]
    pub submitted_at: Option<TimeStamp<Utc>>,
}

impl Document {
    pub fn is_editable(&self) -> bool {
        matches!(self.status, Status::Draft | Status::OnRevision)
    }
    pub fn is_locked(&self) -> bool {
        self.status.is_terminal()
    }
}

pub(crate) fn encode_document(document: &Document) -> Result<Vec<u8>, WorkflowError> {
    minicbor::to_vec(document).map_err(|e| WorkflowError::Codec(e.to_string()))
}

pub(crate) fn decode_document(raw: &[u8]) -> Result<Document, WorkflowError> {
    minicbor::decode(raw).map_err(|e| WorkflowError::Codec(e.to_string()))
}
