//! Shared test harness modules for the teamroute CLI.

mod helpers;
