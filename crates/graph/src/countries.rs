//! ISO-3166-1 alpha-2 seed list for `GraphStore::seed_country_codes`.
//!
//! The rank-info parser (§4.C) emits per-country rank edges keyed by a
//! two-letter code; pre-seeding the `country` vertex collection means
//! those edge inserts never race a missing endpoint on a cold graph.

pub const COUNTRY_CODES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("CH", "Switzerland"),
    ("AT", "Austria"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("IE", "Ireland"),
    ("GR", "Greece"),
    ("RU", "Russian Federation"),
    ("UA", "Ukraine"),
    ("TR", "Turkey"),
    ("IN", "India"),
    ("CN", "China"),
    ("JP", "Japan"),
    ("KR", "Korea, Republic of"),
    ("HK", "Hong Kong"),
    ("TW", "Taiwan"),
    ("SG", "Singapore"),
    ("MY", "Malaysia"),
    ("ID", "Indonesia"),
    ("TH", "Thailand"),
    ("VN", "Viet Nam"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
    ("BD", "Bangladesh"),
    ("BR", "Brazil"),
    ("MX", "Mexico"),
    ("AR", "Argentina"),
    ("CL", "Chile"),
    ("CO", "Colombia"),
    ("PE", "Peru"),
    ("ZA", "South Africa"),
    ("NG", "Nigeria"),
    ("EG", "Egypt"),
    ("KE", "Kenya"),
    ("SA", "Saudi Arabia"),
    ("AE", "United Arab Emirates"),
    ("IL", "Israel"),
    ("NZ", "New Zealand"),
    ("RO", "Romania"),
    ("CZ", "Czechia"),
    ("HU", "Hungary"),
    ("BG", "Bulgaria"),
    ("HR", "Croatia"),
    ("SK", "Slovakia"),
    ("SI", "Slovenia"),
    ("LT", "Lithuania"),
    ("LV", "Latvia"),
    ("EE", "Estonia"),
    ("IS", "Iceland"),
];
