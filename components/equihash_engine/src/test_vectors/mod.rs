pub(crate) mod invalid;
