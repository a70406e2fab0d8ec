pub mod match_record;

pub use match_record::{
    confidence_decimal, MatchAnalytics, MatchRecord, MatchRecordFilter, MatchTypeStats,
    NewMatchRecord, UserAction,
};
