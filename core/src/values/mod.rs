//! Runtime values and the host capability surface.
//!
//! Hosts expose data through [`Value`]: plain scalars and collections, records
//! implementing [`Object`], and functions wrapped in [`Function`]. Functions
//! come in three calling conventions (see [`Callable`]) so call sites can pick
//! the cheapest one statically.

mod function;
mod object;
pub mod time;
mod typed;
mod value;

pub use function::{CallError, Callable, Function};
pub(crate) use function::guard;
pub use object::{Object, Record, lookup};
pub use typed::TypedFn;
pub use value::Value;

static_assertions::assert_impl_all!(Value: Send, Sync, Clone);
