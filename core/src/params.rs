//! Query parameter encoding and closed token enums.
//!
//! # Design
//! Every parameter family the API accepts as a token (sort direction, team
//! status, US/Canadian region, ...) is a closed enum with one canonical
//! string per variant. Unknown tokens are rejected when parsing, so an
//! invalid filter never reaches the server. `ToQueryValue` turns any
//! supported parameter into zero, one, or many query values.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::QueryValue;

/// Conversion of a parameter into its query-string form.
///
/// `None` means the key is omitted entirely.
pub trait ToQueryValue {
    fn to_query_value(&self) -> Option<QueryValue>;
}

impl<T: ToQueryValue + ?Sized> ToQueryValue for &T {
    fn to_query_value(&self) -> Option<QueryValue> {
        (**self).to_query_value()
    }
}

impl ToQueryValue for str {
    fn to_query_value(&self) -> Option<QueryValue> {
        Some(QueryValue::Single(self.to_string()))
    }
}

impl ToQueryValue for String {
    fn to_query_value(&self) -> Option<QueryValue> {
        self.as_str().to_query_value()
    }
}

macro_rules! display_query_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToQueryValue for $ty {
                fn to_query_value(&self) -> Option<QueryValue> {
                    Some(QueryValue::Single(self.to_string()))
                }
            }
        )*
    };
}

display_query_value!(u8, u16, u32, u64, usize, i32, i64, bool, Uuid);

/// Dates are sent as `YYYY-MM-DD` with no timezone handling.
impl ToQueryValue for NaiveDate {
    fn to_query_value(&self) -> Option<QueryValue> {
        Some(QueryValue::Single(self.format("%Y-%m-%d").to_string()))
    }
}

impl<T: ToQueryValue> ToQueryValue for Option<T> {
    fn to_query_value(&self) -> Option<QueryValue> {
        self.as_ref().and_then(ToQueryValue::to_query_value)
    }
}

impl<T: ToQueryValue> ToQueryValue for [T] {
    fn to_query_value(&self) -> Option<QueryValue> {
        let values: Vec<String> = self
            .iter()
            .filter_map(ToQueryValue::to_query_value)
            .flat_map(|value| match value {
                QueryValue::Single(v) => vec![v],
                QueryValue::Many(vs) => vs,
            })
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(QueryValue::Many(values))
        }
    }
}

impl<T: ToQueryValue> ToQueryValue for Vec<T> {
    fn to_query_value(&self) -> Option<QueryValue> {
        self.as_slice().to_query_value()
    }
}

/// Defines a closed token enum with its canonical wire strings.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    other => Err(ApiError::validation(format!(
                        "unknown {} token `{}`",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl ToQueryValue for $name {
            fn to_query_value(&self) -> Option<QueryValue> {
                Some(QueryValue::Single(self.as_str().to_string()))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

token_enum! {
    SortDirection {
        Asc => "ASC",
        Desc => "DESC",
    }
}

token_enum! {
    TeamStatus {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
    }
}

token_enum! {
    TeamType {
        Normal => "NORMAL",
        Platinum => "PLATINUM",
        Group => "GROUP",
        Domestic => "DOMESTIC",
        Pro => "PRO",
    }
}

token_enum! {
    AgentStatus {
        Candidate => "CANDIDATE",
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Rejected => "REJECTED",
    }
}

token_enum! {
    /// Transaction lifecycle states accepted by transaction searches.
    LifecycleState {
        New => "NEW",
        NeedsCommissionValidation => "NEEDS_COMMISSION_VALIDATION",
        CommissionValidated => "COMMISSION_VALIDATED",
        ReadyForCommissionDocumentGeneration => "READY_FOR_COMMISSION_DOCUMENT_GENERATION",
        CommissionDocumentGenerated => "COMMISSION_DOCUMENT_GENERATED",
        CommissionDocumentApproved => "COMMISSION_DOCUMENT_APPROVED",
        CommissionDocumentSent => "COMMISSION_DOCUMENT_SENT",
        ApprovedForClosing => "APPROVED_FOR_CLOSING",
        Closed => "CLOSED",
        Settled => "SETTLED",
        Terminated => "TERMINATED",
    }
}

token_enum! {
    /// US states and Canadian provinces, by their upper-case name.
    StateOrProvince {
        Alabama => "ALABAMA",
        Alaska => "ALASKA",
        Arizona => "ARIZONA",
        Arkansas => "ARKANSAS",
        California => "CALIFORNIA",
        Colorado => "COLORADO",
        Connecticut => "CONNECTICUT",
        Delaware => "DELAWARE",
        DistrictOfColumbia => "DISTRICT_OF_COLUMBIA",
        Florida => "FLORIDA",
        Georgia => "GEORGIA",
        Hawaii => "HAWAII",
        Idaho => "IDAHO",
        Illinois => "ILLINOIS",
        Indiana => "INDIANA",
        Iowa => "IOWA",
        Kansas => "KANSAS",
        Kentucky => "KENTUCKY",
        Louisiana => "LOUISIANA",
        Maine => "MAINE",
        Maryland => "MARYLAND",
        Massachusetts => "MASSACHUSETTS",
        Michigan => "MICHIGAN",
        Minnesota => "MINNESOTA",
        Mississippi => "MISSISSIPPI",
        Missouri => "MISSOURI",
        Montana => "MONTANA",
        Nebraska => "NEBRASKA",
        Nevada => "NEVADA",
        NewHampshire => "NEW_HAMPSHIRE",
        NewJersey => "NEW_JERSEY",
        NewMexico => "NEW_MEXICO",
        NewYork => "NEW_YORK",
        NorthCarolina => "NORTH_CAROLINA",
        NorthDakota => "NORTH_DAKOTA",
        Ohio => "OHIO",
        Oklahoma => "OKLAHOMA",
        Oregon => "OREGON",
        Pennsylvania => "PENNSYLVANIA",
        RhodeIsland => "RHODE_ISLAND",
        SouthCarolina => "SOUTH_CAROLINA",
        SouthDakota => "SOUTH_DAKOTA",
        Tennessee => "TENNESSEE",
        Texas => "TEXAS",
        Utah => "UTAH",
        Vermont => "VERMONT",
        Virginia => "VIRGINIA",
        Washington => "WASHINGTON",
        WestVirginia => "WEST_VIRGINIA",
        Wisconsin => "WISCONSIN",
        Wyoming => "WYOMING",
        Alberta => "ALBERTA",
        BritishColumbia => "BRITISH_COLUMBIA",
        Manitoba => "MANITOBA",
        NewBrunswick => "NEW_BRUNSWICK",
        NewfoundlandAndLabrador => "NEWFOUNDLAND_AND_LABRADOR",
        NovaScotia => "NOVA_SCOTIA",
        Ontario => "ONTARIO",
        PrinceEdwardIsland => "PRINCE_EDWARD_ISLAND",
        Quebec => "QUEBEC",
        Saskatchewan => "SASKATCHEWAN",
    }
}

/// Sort order: one or more field names plus a direction.
///
/// Encoded as repeated `sortBy` keys and a single `sortDirection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub fields: Vec<String>,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
            direction: SortDirection::Desc,
        }
    }

    pub fn then_by(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}
