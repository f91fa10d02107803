//! Integration tests for the rental escrow workspace live under `tests/`.
