// src/plan/status.rs

//! Step status values.
//!
//! A [`Status`] is a [`StatusCode`] plus an optional human readable reason.
//! Codes are totally ordered:
//!
//! `Pending(0) < Submitted(1) < Complete(2) < Skipped(3) < Failed(4)`
//!
//! `Complete` and `Skipped` are successful terminal codes, `Failed` is the only
//! failing terminal code. Progress checks compare codes, e.g.
//! `status.code() >= StatusCode::Submitted` means "handed off at least once".

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusCode {
    Pending = 0,
    Submitted = 1,
    Complete = 2,
    Skipped = 3,
    Failed = 4,
}

impl StatusCode {
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Pending => "pending",
            StatusCode::Submitted => "submitted",
            StatusCode::Complete => "complete",
            StatusCode::Skipped => "skipped",
            StatusCode::Failed => "failed",
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusCode::Complete | StatusCode::Skipped | StatusCode::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Status {
    code: StatusCode,
    reason: Option<Cow<'static, str>>,
}

pub const PENDING: Status = Status::fixed(StatusCode::Pending, None);
pub const SUBMITTED: Status = Status::fixed(StatusCode::Submitted, None);
pub const COMPLETE: Status = Status::fixed(StatusCode::Complete, None);
pub const SKIPPED: Status = Status::fixed(StatusCode::Skipped, None);
pub const FAILED: Status = Status::fixed(StatusCode::Failed, None);

pub const NOT_SUBMITTED: Status = Status::fixed(StatusCode::Skipped, Some("disabled"));
pub const NOT_UPDATED: Status = Status::fixed(StatusCode::Skipped, Some("locked"));
pub const DID_NOT_CHANGE: Status = Status::fixed(StatusCode::Skipped, Some("nochange"));
pub const DOES_NOT_EXIST: Status =
    Status::fixed(StatusCode::Skipped, Some("does not exist in cloudformation"));
pub const INTERRUPTED: Status = Status::fixed(StatusCode::Failed, Some("interrupted"));
pub const DEPENDENCY_FAILED: Status =
    Status::fixed(StatusCode::Failed, Some("dependency has failed"));

impl Status {
    const fn fixed(code: StatusCode, reason: Option<&'static str>) -> Self {
        let reason = match reason {
            Some(r) => Some(Cow::Borrowed(r)),
            None => None,
        };
        Self { code, reason }
    }

    pub fn new(code: StatusCode, reason: Option<String>) -> Self {
        Self {
            code,
            reason: reason.map(Cow::Owned),
        }
    }

    pub fn pending(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::Pending, Some(reason.into()))
    }

    pub fn submitted(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::Submitted, Some(reason.into()))
    }

    pub fn complete(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::Complete, Some(reason.into()))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::Skipped, Some(reason.into()))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::Failed, Some(reason.into()))
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.code.name()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.code, StatusCode::Complete | StatusCode::Skipped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{} ({reason})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}
