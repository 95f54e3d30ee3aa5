use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Description used for codes missing from the table.
pub const UNKNOWN_STATUS: &str = "Unknown Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code_num: u16,
    pub message: &'static str,
}

impl Status {
    pub const OK: Status = Status {
        code_num: 200,
        message: "OK",
    };
    pub const BAD_REQUEST: Status = Status {
        code_num: 400,
        message: "Bad Request",
    };
    pub const NOT_FOUND: Status = Status {
        code_num: 404,
        message: "Not Found",
    };
    pub const PAYLOAD_TOO_LARGE: Status = Status {
        code_num: 413,
        message: "Payload Too Large",
    };
    pub const SERVER_ERROR: Status = Status {
        code_num: 500,
        message: "Internal Server Error",
    };

    /// Looks a code up in the status table. Codes the table does not know keep
    /// their number and get [`UNKNOWN_STATUS`] as description.
    pub fn from_code(code_num: u16) -> Status {
        let message = STATUS_TABLE
            .get(&code_num)
            .copied()
            .unwrap_or(UNKNOWN_STATUS);
        Status { code_num, message }
    }

    pub fn is_error(&self) -> bool {
        self.code_num >= 400
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code_num, self.message)
    }
}

static STATUS_TABLE: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    [
        Status::OK,
        Status::BAD_REQUEST,
        Status::NOT_FOUND,
        Status::PAYLOAD_TOO_LARGE,
        Status::SERVER_ERROR,
    ]
    .into_iter()
    .map(|s| (s.code_num, s.message))
    .collect()
});
