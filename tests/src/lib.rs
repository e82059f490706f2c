//! Integration test package for the xstream workspace. See `tests/`.
