//! Step buckets.

use std::fmt;

/// Where in a step an action runs.
///
/// Variants are declared in execution order, so the derived `Ord` is the
/// bucket order.  A sort bucket always directly precedes the bucket whose
/// lanes it groups.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionOrder {
    /// Track management before any transport.
    Start,
    UserStart,
    SortStart,
    /// Step-limit selection.
    Pre,
    UserPre,
    SortPre,
    /// Propagation.
    Along,
    SortAlong,
    PrePost,
    SortPrePost,
    /// Interactions and boundary crossing.
    Post,
    UserPost,
    /// Secondary collection and slot recycling.
    End,
}

impl ActionOrder {
    pub const ALL: [ActionOrder; 13] = [
        ActionOrder::Start,
        ActionOrder::UserStart,
        ActionOrder::SortStart,
        ActionOrder::Pre,
        ActionOrder::UserPre,
        ActionOrder::SortPre,
        ActionOrder::Along,
        ActionOrder::SortAlong,
        ActionOrder::PrePost,
        ActionOrder::SortPrePost,
        ActionOrder::Post,
        ActionOrder::UserPost,
        ActionOrder::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionOrder::Start       => "start",
            ActionOrder::UserStart   => "user_start",
            ActionOrder::SortStart   => "sort_start",
            ActionOrder::Pre         => "pre",
            ActionOrder::UserPre     => "user_pre",
            ActionOrder::SortPre     => "sort_pre",
            ActionOrder::Along       => "along",
            ActionOrder::SortAlong   => "sort_along",
            ActionOrder::PrePost     => "pre_post",
            ActionOrder::SortPrePost => "sort_pre_post",
            ActionOrder::Post        => "post",
            ActionOrder::UserPost    => "user_post",
            ActionOrder::End         => "end",
        }
    }
}

impl fmt::Display for ActionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
