//! Model evaluators, one module per family.

pub(crate) mod amcvn;
pub(crate) mod flare;
pub(crate) mod microlens;
pub(crate) mod periodic;
pub(crate) mod walk;
