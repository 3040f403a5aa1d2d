use std::error::Error;
use std::fmt;
use std::io;

/// Which factor matrix an update was working on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    U,
    V,
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Factor::U => write!(f, "U"),
            Factor::V => write!(f, "V"),
        }
    }
}

/// Errors from building the rating matrix and fitting the factorization
#[derive(Debug)]
pub enum WnmfError {
    /// A triple points outside the user/item space established by the lookup tables
    MalformedIndex {
        user: usize,
        item: usize,
        n_users: usize,
        n_items: usize,
    },
    InvalidRating {
        user: usize,
        item: usize,
        rating: f64,
    },
    EmptyInput,
    /// Zero denominator hit while the guard is disabled
    DegenerateDenominator {
        factor: Factor,
        row: usize,
        col: usize,
    },
    /// An update produced NaN or Inf
    NumericOverflow {
        factor: Factor,
        row: usize,
        col: usize,
    },
    /// The weighted loss overflowed; `sweep` 0 is the loss of the initial factors
    NonFiniteLoss {
        sweep: usize,
    },
    InvalidConfiguration(String),
    InvalidIndexTable(String),
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Npy(String),
}

impl fmt::Display for WnmfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WnmfError::MalformedIndex {
                user,
                item,
                n_users,
                n_items,
            } => write!(
                f,
                "Rating ({}, {}) is outside the {}x{} rating matrix",
                user, item, n_users, n_items
            ),
            WnmfError::InvalidRating { user, item, rating } => write!(
                f,
                "Rating at ({}, {}) must be finite and non-negative, got {}",
                user, item, rating
            ),
            WnmfError::EmptyInput => write!(f, "No ratings supplied, nothing to factorize"),
            WnmfError::DegenerateDenominator { factor, row, col } => write!(
                f,
                "Zero denominator updating {}[{}, {}] with the guard disabled",
                factor, row, col
            ),
            WnmfError::NumericOverflow { factor, row, col } => {
                write!(f, "Non-finite value produced at {}[{}, {}]", factor, row, col)
            }
            WnmfError::NonFiniteLoss { sweep } => {
                write!(f, "Weighted loss is not finite after sweep {}", sweep)
            }
            WnmfError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            WnmfError::InvalidIndexTable(msg) => write!(f, "Invalid index table: {}", msg),
            WnmfError::Io(e) => write!(f, "I/O error: {}", e),
            WnmfError::Csv(e) => write!(f, "CSV error: {}", e),
            WnmfError::Json(e) => write!(f, "JSON error: {}", e),
            WnmfError::Npy(msg) => write!(f, "NPY error: {}", msg),
        }
    }
}

impl Error for WnmfError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WnmfError::Io(e) => Some(e),
            WnmfError::Csv(e) => Some(e),
            WnmfError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WnmfError {
    fn from(e: io::Error) -> Self {
        WnmfError::Io(e)
    }
}

impl From<csv::Error> for WnmfError {
    fn from(e: csv::Error) -> Self {
        WnmfError::Csv(e)
    }
}

impl From<serde_json::Error> for WnmfError {
    fn from(e: serde_json::Error) -> Self {
        WnmfError::Json(e)
    }
}

impl From<ndarray_npy::WriteNpyError> for WnmfError {
    fn from(e: ndarray_npy::WriteNpyError) -> Self {
        WnmfError::Npy(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WnmfError>;
