pub mod bitstream;
pub mod capture;
pub mod crunch;
pub mod error;
pub mod filter;
pub mod frame;
pub mod telemetry;

pub use capture::{BacktraceCapturer, BacktraceResolver, Capturer, Resolver};
pub use crunch::{crunch, uncrunch, NONE_SENTINEL};
pub use error::StacktraceError;
pub use filter::{And, Filter, FunctionContains, Matcher, PackageIs, Trim, TrimBottom, TrimTop};
pub use frame::{Callstack, Frame};
pub use telemetry::telemetry_payload;
