//! `SQLite` database for the offline report queue.

fieldalert_core::define_database!(QueueDatabase, "Queue migrations complete");
