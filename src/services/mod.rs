pub mod api_service;
pub mod bot_service;
pub mod chart_renderer;
pub mod lookups;
pub mod market_cap;
pub mod notifier;
pub mod oracle;
pub mod spike_monitor;

pub use api_service::ApiService;
pub use bot_service::BotService;
pub use chart_renderer::{ChartRenderer, PlottersChartRenderer};
pub use market_cap::MarketCapService;
pub use notifier::{Notifier, TelegramNotifier};
pub use oracle::SupraOracleClient;
pub use spike_monitor::SpikeMonitor;
