
pub(crate) use fixtures::*;

mod provider_tests;
mod reducer_tests;
