pub mod deadline;
pub mod pipe;
pub mod prefixed;
pub mod shared;
pub mod split;
pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;
