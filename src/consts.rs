/// Maximum valid year (inclusive)
pub const MAX_YEAR: u16 = 9999;

/// Maximum valid month (December)
pub const MAX_MONTH: u8 = 12;

/// Date component separator (ISO 8601 format)
pub const DATE_SEPARATOR: char = '-';

/// Hour of the business-hour anchor applied to calendar dates
pub const ANCHOR_HOUR: u32 = 10;
/// Minute of the business-hour anchor applied to calendar dates
pub const ANCHOR_MINUTE: u32 = 30;

/// Milliseconds in one (civil, non-DST) day
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Interval between live-mode recomputations, in milliseconds
pub const LIVE_TICK_MS: u64 = 100;

/// Days either side of today used when nothing is stored yet
pub const DEFAULT_SPAN_HALF_DAYS: i64 = 15;

/// Upper bound of any percentage value
pub const PERCENT_MAX: f64 = 100.0;

/// Hue at 100% progress (green); 0 is red and half of this is yellow
pub const HUE_MAX: f64 = 120.0;
/// Saturation of the progress colour, in percent
pub const COLOR_SATURATION: u8 = 85;
/// Lightness of the progress colour, in percent
pub const COLOR_LIGHTNESS: u8 = 50;

/// Radius of the gauge ring
pub const GAUGE_RADIUS: f64 = 84.0;

/// Decimal places of the precise percentage text
pub const PRECISE_DECIMALS: usize = 5;

/// Key of the persisted `{start, today, end}` record
pub const DATES_KEY: &str = "daytoday:dates";
/// Key of the persisted theme preference
pub const THEME_KEY: &str = "daytoday:theme";
/// Key of the persisted live-mode flag
pub const LIVE_KEY: &str = "daytoday:isLive";
