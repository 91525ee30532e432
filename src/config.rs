//! Init-time engine configuration.

/// Tunables fixed at engine construction. Nothing here changes per-submit.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Depth levels per side included in a market-state snapshot
    pub depth_levels: usize,
    /// Number of recent trades retained for the volatility window
    pub trade_window: usize,
    /// Initial block count for the order pool
    pub order_blocks: usize,
    /// Initial block count for the price-level pool
    pub level_blocks: usize,
    /// Cells per pool block
    pub block_slots: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth_levels: 10,
            trade_window: 100,
            order_blocks: 10,
            level_blocks: 1,
            block_slots: 4096,
        }
    }
}
