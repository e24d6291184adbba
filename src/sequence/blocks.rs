//! Fixed opening and closing prayers that bookend every sequence.

/// One fixed step: (title key, content key, alternate content key)
pub(crate) type FixedStep = (&'static str, &'static str, Option<&'static str>);

pub(crate) const OPENING: [FixedStep; 8] = [
    ("titles.intention", "prayers.offering", None),
    ("titles.sign_of_cross", "prayers.sign_of_cross", None),
    ("titles.apostles_creed", "prayers.apostles_creed", None),
    ("titles.our_father", "prayers.our_father", Some("prayers.our_father_response")),
    ("titles.hail_mary_faith", "prayers.hail_mary", Some("prayers.hail_mary_response")),
    ("titles.hail_mary_hope", "prayers.hail_mary", Some("prayers.hail_mary_response")),
    ("titles.hail_mary_charity", "prayers.hail_mary", Some("prayers.hail_mary_response")),
    ("titles.glory_be", "prayers.glory_be", Some("prayers.glory_be_response")),
];

pub(crate) const CLOSING: [FixedStep; 4] = [
    ("titles.hail_holy_queen", "prayers.hail_holy_queen", None),
    ("titles.versicle", "prayers.versicle", Some("prayers.versicle_response")),
    ("titles.closing_prayer", "prayers.closing_prayer", None),
    ("titles.sign_of_cross", "prayers.sign_of_cross", None),
];

pub(crate) const SALUTATION: FixedStep = (
    "titles.salutation",
    "prayers.salutation",
    Some("prayers.salutation_response"),
);

pub(crate) const LEADER: FixedStep = (
    "titles.our_father",
    "prayers.our_father",
    Some("prayers.our_father_response"),
);

pub(crate) const REPEATED: FixedStep = (
    "titles.hail_mary",
    "prayers.hail_mary",
    Some("prayers.hail_mary_response"),
);

pub(crate) const RESPONSORY: FixedStep = (
    "titles.glory_be",
    "prayers.glory_be",
    Some("prayers.fatima"),
);

/// Content key of the announcement for group `position` of `selector`
pub(crate) fn announcement_keys(selector: &str, position: u8) -> (String, String, String) {
    (
        format!("mysteries.{selector}.{position}.title"),
        format!("mysteries.{selector}.{position}.scripture"),
        format!("mysteries.{selector}.{position}.meditation"),
    )
}

/// Content key of the offering (fruit of the mystery) for group `position`
pub(crate) fn offering_keys(selector: &str, position: u8) -> (String, String) {
    (
        "titles.fruit".to_string(),
        format!("mysteries.{selector}.{position}.fruit"),
    )
}
