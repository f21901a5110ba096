//! Domain services: parsing, matching, deciding, naming, linking, scanning.

pub mod decider;
pub mod filename_parser;
pub mod matcher;
pub mod media;
pub mod movies;
pub mod naming;
pub mod scanner;
pub mod sources;
pub mod targets;
pub mod titles;

pub use decider::{DEFAULT_MATCH_THRESHOLD, MatchDecider, MatchOutcome};
pub use matcher::Matcher;
pub use media::ParsedMediaItem;
pub use movies::{Genre, Movie, MovieMatchCandidate, MovieMatchRequest, NonMatchReason};
pub use naming::{DEFAULT_MOVIE_TEMPLATE, NameFormatter};
pub use scanner::MediaScanner;
pub use sources::{MediaSource, SourceKind, create_source};
pub use targets::{MediaTarget, TargetError, TargetKind, TargetResolver};
pub use titles::canonical_movie_title;
