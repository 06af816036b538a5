use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone in which both ends of the report date range are interpreted.
pub const REPORT_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// First day covered by every delivery report.
pub const REPORT_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2020, 1, 1) {
    Some(date) => date,
    None => panic!("invalid report start date"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Date,
    AdvertiserName,
    OrderName,
    LineItemName,
    AdUnitName,
}

impl Dimension {
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::AdvertiserName => "ADVERTISER_NAME",
            Self::OrderName => "ORDER_NAME",
            Self::LineItemName => "LINE_ITEM_NAME",
            Self::AdUnitName => "AD_UNIT_NAME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionAttribute {
    LineItemGoalQuantity,
    LineItemDeliveryIndicator,
}

impl DimensionAttribute {
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::LineItemGoalQuantity => "LINE_ITEM_GOAL_QUANTITY",
            Self::LineItemDeliveryIndicator => "LINE_ITEM_DELIVERY_INDICATOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    TotalLineItemLevelImpressions,
    TotalLineItemLevelClicks,
    TotalActiveViewViewableImpressions,
    TotalActiveViewMeasurableImpressions,
}

impl Column {
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::TotalLineItemLevelImpressions => "TOTAL_LINE_ITEM_LEVEL_IMPRESSIONS",
            Self::TotalLineItemLevelClicks => "TOTAL_LINE_ITEM_LEVEL_CLICKS",
            Self::TotalActiveViewViewableImpressions => "TOTAL_ACTIVE_VIEW_VIEWABLE_IMPRESSIONS",
            Self::TotalActiveViewMeasurableImpressions => {
                "TOTAL_ACTIVE_VIEW_MEASURABLE_IMPRESSIONS"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeType {
    CustomDate,
}

impl DateRangeType {
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::CustomDate => "CUSTOM_DATE",
        }
    }
}

/// Inclusive reporting window. The backend only receives the calendar date
/// of each bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DateRange {
    /// From [`REPORT_START_DATE`] up to `now`, both in [`REPORT_TIME_ZONE`].
    pub fn since_report_start(now: DateTime<Utc>) -> Self {
        let start_local = REPORT_START_DATE.and_time(NaiveTime::MIN);
        let start = REPORT_TIME_ZONE
            .from_local_datetime(&start_local)
            .earliest()
            .unwrap_or_else(|| REPORT_TIME_ZONE.from_utc_datetime(&start_local));

        Self {
            start,
            end: now.with_timezone(&REPORT_TIME_ZONE),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

/// Immutable description of the report to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub dimensions: Vec<Dimension>,
    pub dimension_attributes: Vec<DimensionAttribute>,
    pub columns: Vec<Column>,
    pub date_range_type: DateRangeType,
    pub date_range: DateRange,
}

impl ReportQuery {
    /// The delivery report: per day, advertiser, order, line item and ad
    /// unit, with goal/delivery attributes and impression/click totals.
    pub fn delivery(now: DateTime<Utc>) -> Self {
        Self {
            dimensions: vec![
                Dimension::Date,
                Dimension::AdvertiserName,
                Dimension::OrderName,
                Dimension::LineItemName,
                Dimension::AdUnitName,
            ],
            dimension_attributes: vec![
                DimensionAttribute::LineItemGoalQuantity,
                DimensionAttribute::LineItemDeliveryIndicator,
            ],
            columns: vec![
                Column::TotalLineItemLevelImpressions,
                Column::TotalLineItemLevelClicks,
                Column::TotalActiveViewViewableImpressions,
                Column::TotalActiveViewMeasurableImpressions,
            ],
            date_range_type: DateRangeType::CustomDate,
            date_range: DateRange::since_report_start(now),
        }
    }
}
