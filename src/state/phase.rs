/// Crawl phase definitions
///
/// A crawl moves from initialization through scheme resolution into the
/// recursive page visit, which alternates between visiting pages, following
/// frames and following links until it is done.
use std::fmt;

/// Represents the current phase of one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// The crawl object is being set up
    Initializing,

    /// The target's scheme and certificate validity are being determined
    ResolvingScheme,

    /// A page is being fetched and searched
    VisitingPage,

    /// The frames of a page are being followed
    FollowingFrames,

    /// The links of the seed page are being followed
    FollowingLinks,

    /// The crawl has finished (or never started)
    Done,
}

impl CrawlPhase {
    /// Returns true once nothing more will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true while pages are being visited
    pub fn is_traversing(&self) -> bool {
        matches!(
            self,
            Self::VisitingPage | Self::FollowingFrames | Self::FollowingLinks
        )
    }

    /// Checks whether the crawl may move from this phase to `next`
    ///
    /// The traversal phases nest through recursion, so they may follow each
    /// other in any order. Every phase may end the crawl.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::Initializing, Self::ResolvingScheme) => true,
            (Self::ResolvingScheme, Self::VisitingPage) => true,
            (current, next) => current.is_traversing() && next.is_traversing(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::ResolvingScheme => "resolving-scheme",
            Self::VisitingPage => "visiting-page",
            Self::FollowingFrames => "following-frames",
            Self::FollowingLinks => "following-links",
            Self::Done => "done",
        }
    }

    /// Returns all phases in crawl order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Initializing,
            Self::ResolvingScheme,
            Self::VisitingPage,
            Self::FollowingFrames,
            Self::FollowingLinks,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
