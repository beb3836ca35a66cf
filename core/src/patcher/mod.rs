//! Ready-made tree rewrites for [`Config::patch`](crate::api::Config::patch).

mod value;

pub use value::ValueGetter;
