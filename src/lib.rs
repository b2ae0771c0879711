//! Mathsheet - formula evaluation core for calculator documents
//!
//! This library models a document of named equations, resolves the
//! references between them, and calculates results in the background.
//!
//! # Features
//!
//! - Real and complex arithmetic with contagious invalid values
//! - Term trees with operators, comparators, and built-in functions
//! - Intervals, summation/product/integral loops, and derivatives with
//!   analytic or numeric differentiation chosen per term
//! - Named equations with arguments, arrays over intervals, and
//!   two-pass validation with recursion detection
//! - Cancellable batch calculation with progress events
//!
//! # Example
//!
//! ```
//! use mathsheet::core::{run_batch, CancelToken, Document, Equation, OperatorKind, TermNode};
//!
//! let mut doc = Document::new();
//! doc.push(Equation::new("a", TermNode::leaf("2")?)?);
//! let body = TermNode::operator(
//!     OperatorKind::Mult,
//!     TermNode::leaf("a")?,
//!     TermNode::leaf("21")?,
//! );
//! doc.push(Equation::new("answer", body)?);
//! assert!(doc.validate().is_empty());
//!
//! let summary = run_batch(&mut doc, &CancelToken::new(), |_event| {});
//! assert_eq!(summary.computed[1].text, "42");
//! # Ok::<(), mathsheet::error::BuildError>(())
//! ```

pub mod core;
pub mod error;
pub mod report;
pub mod settings;
pub mod units;
pub mod value;

// Re-export commonly used types
pub use error::{BuildError, Cancelled, SheetError, SheetResult};
pub use settings::CalcSettings;
pub use value::{CalcValue, InvalidKind};
