//! Object categories. Each category owns an independent free list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a free list inside an [`Arena`](super::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u16);

impl CategoryId {
    /// Creates a category from its raw index.
    #[inline]
    pub const fn new(index: u16) -> Self {
        CategoryId(index)
    }

    /// Position of the category's free list.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for CategoryId {
    fn from(index: u16) -> Self {
        CategoryId(index)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order kinds that get a dedicated free list in order-management arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderCategory {
    /// Market orders
    Market = 0,
    /// Limit orders
    Limit = 1,
    /// Stop orders
    Stop = 2,
    /// Stop-limit orders
    StopLimit = 3,
}

impl OrderCategory {
    /// Number of order categories, i.e. the category count to build an arena with.
    pub const COUNT: usize = 4;

    /// Every order category in free-list order.
    pub const ALL: [OrderCategory; Self::COUNT] = [
        OrderCategory::Market,
        OrderCategory::Limit,
        OrderCategory::Stop,
        OrderCategory::StopLimit,
    ];
}

impl From<OrderCategory> for CategoryId {
    fn from(category: OrderCategory) -> Self {
        CategoryId(category as u16)
    }
}

impl fmt::Display for OrderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderCategory::Market => "MARKET",
            OrderCategory::Limit => "LIMIT",
            OrderCategory::Stop => "STOP",
            OrderCategory::StopLimit => "STOP_LIMIT",
        };
        f.write_str(name)
    }
}
