//! Static catalog of the standard HTTP error codes
//!
//! One entry per client and server error code a host framework ships a
//! default handler for. Titles are the canonical reason phrases; descriptions
//! are short and safe to send to clients.

use http::StatusCode;

use crate::problem::Problem;

/// Static error definition for one standard HTTP error code.
#[derive(Debug, Clone, Copy)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub description: &'static str,
}

/// Every standard HTTP error code, sorted by status.
pub const DEFINITIONS: &[ErrDef] = &[
    ErrDef {
        status: 400,
        title: "Bad Request",
        description: "The request could not be understood or was missing required parameters.",
    },
    ErrDef {
        status: 401,
        title: "Unauthorized",
        description: "Valid authentication credentials are required.",
    },
    ErrDef {
        status: 403,
        title: "Forbidden",
        description: "The server understood the request but refuses to authorize it.",
    },
    ErrDef {
        status: 404,
        title: "Not Found",
        description: "The requested resource was not found.",
    },
    ErrDef {
        status: 405,
        title: "Method Not Allowed",
        description: "The method is not allowed for the requested resource.",
    },
    ErrDef {
        status: 406,
        title: "Not Acceptable",
        description: "The resource cannot produce a response acceptable to the client.",
    },
    ErrDef {
        status: 408,
        title: "Request Timeout",
        description: "The server timed out waiting for the request.",
    },
    ErrDef {
        status: 409,
        title: "Conflict",
        description: "The request conflicts with the current state of the resource.",
    },
    ErrDef {
        status: 410,
        title: "Gone",
        description: "The requested resource is no longer available.",
    },
    ErrDef {
        status: 411,
        title: "Length Required",
        description: "A Content-Length header is required.",
    },
    ErrDef {
        status: 412,
        title: "Precondition Failed",
        description: "A precondition in the request headers was not met.",
    },
    ErrDef {
        status: 413,
        title: "Payload Too Large",
        description: "The request body exceeds the size the server accepts.",
    },
    ErrDef {
        status: 414,
        title: "URI Too Long",
        description: "The request URI is longer than the server accepts.",
    },
    ErrDef {
        status: 415,
        title: "Unsupported Media Type",
        description: "The request body format is not supported by the server.",
    },
    ErrDef {
        status: 416,
        title: "Range Not Satisfiable",
        description: "The requested range is not available for the resource.",
    },
    ErrDef {
        status: 417,
        title: "Expectation Failed",
        description: "The expectation given in the Expect header could not be met.",
    },
    ErrDef {
        status: 418,
        title: "I'm a teapot",
        description: "The server refuses to brew coffee with a teapot.",
    },
    ErrDef {
        status: 421,
        title: "Misdirected Request",
        description: "The request was directed at a server unable to produce a response.",
    },
    ErrDef {
        status: 422,
        title: "Unprocessable Entity",
        description: "The request was well-formed but contains semantic errors.",
    },
    ErrDef {
        status: 423,
        title: "Locked",
        description: "The requested resource is locked.",
    },
    ErrDef {
        status: 424,
        title: "Failed Dependency",
        description: "The request failed because a dependent request failed.",
    },
    ErrDef {
        status: 428,
        title: "Precondition Required",
        description: "The request is required to be conditional.",
    },
    ErrDef {
        status: 429,
        title: "Too Many Requests",
        description: "The client sent too many requests in a given amount of time.",
    },
    ErrDef {
        status: 431,
        title: "Request Header Fields Too Large",
        description: "The request headers are larger than the server accepts.",
    },
    ErrDef {
        status: 451,
        title: "Unavailable For Legal Reasons",
        description: "The resource is unavailable for legal reasons.",
    },
    ErrDef {
        status: 500,
        title: "Internal Server Error",
        description: "The server encountered an internal error and was unable to complete the request.",
    },
    ErrDef {
        status: 501,
        title: "Not Implemented",
        description: "The server does not support the requested operation.",
    },
    ErrDef {
        status: 502,
        title: "Bad Gateway",
        description: "The upstream server returned an invalid response.",
    },
    ErrDef {
        status: 503,
        title: "Service Unavailable",
        description: "The server is temporarily unable to handle the request.",
    },
    ErrDef {
        status: 504,
        title: "Gateway Timeout",
        description: "The upstream server did not respond in time.",
    },
    ErrDef {
        status: 505,
        title: "HTTP Version Not Supported",
        description: "The HTTP protocol version used in the request is not supported.",
    },
];

/// Look up the definition for `status`, if it is a standard error code.
#[must_use]
pub fn lookup(status: StatusCode) -> Option<&'static ErrDef> {
    DEFINITIONS
        .binary_search_by_key(&status.as_u16(), |def| def.status)
        .ok()
        .map(|index| &DEFINITIONS[index])
}

impl ErrDef {
    /// The status as a typed `StatusCode`.
    ///
    /// Catalog statuses are always valid; `INTERNAL_SERVER_ERROR` is the
    /// fallback should an invalid code ever appear in a definition.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert this definition into a Problem with the catalog description.
    #[inline]
    pub fn as_problem(&self) -> Problem {
        Problem::new(self.status_code(), self.title).with_detail(self.description)
    }

    /// Convert this definition into a Problem with a caller-supplied detail.
    #[inline]
    pub fn as_problem_with_detail(&self, detail: impl Into<String>) -> Problem {
        Problem::new(self.status_code(), self.title).with_detail(detail)
    }
}
