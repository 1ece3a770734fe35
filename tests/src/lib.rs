//! Cross-crate tests for fathom. Everything runs on loopback or in memory.

#[cfg(test)]
mod discovery;
