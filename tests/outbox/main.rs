//! Outbox integration tests.


mod end_to_end;
mod processor;
