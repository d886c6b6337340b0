use std::collections::HashSet;

use crate::models::BloodType;

/// Recipient-major donor eligibility matrix over the 8 ABO/Rh types.
///
/// Row = recipient, column = donor, both in `BloodType::ALL` order
/// (A+, A-, B+, B-, AB+, AB-, O+, O-). All 64 entries are written out
/// explicitly because the source of truth is the hand-authored transfusion
/// table, not a formula.
const COMPATIBILITY: [[bool; 8]; 8] = [
    //                A+     A-     B+     B-     AB+    AB-    O+     O-
    /* A+  */ [true,  true,  false, false, false, false, true,  true ],
    /* A-  */ [false, true,  false, false, false, false, false, true ],
    /* B+  */ [false, false, true,  true,  false, false, true,  true ],
    /* B-  */ [false, false, false, true,  false, false, false, true ],
    /* AB+ */ [true,  true,  true,  true,  true,  true,  true,  true ],
    /* AB- */ [false, true,  false, true,  false, true,  false, true ],
    /* O+  */ [false, false, false, false, false, false, true,  true ],
    /* O-  */ [false, false, false, false, false, false, false, true ],
];

/// Can a donor of type `donor` give to a recipient of type `recipient`?
///
/// Total over the 8x8 domain: every pair has a defined answer.
#[inline]
pub fn is_compatible(recipient: BloodType, donor: BloodType) -> bool {
    COMPATIBILITY[recipient.index()][donor.index()]
}

/// All donor types a recipient of the given type can accept.
pub fn compatible_donors_for(recipient: BloodType) -> HashSet<BloodType> {
    BloodType::ALL
        .into_iter()
        .filter(|&donor| is_compatible(recipient, donor))
        .collect()
}

/// All recipient types a donor of the given type can give to.
pub fn compatible_recipients_for(donor: BloodType) -> HashSet<BloodType> {
    BloodType::ALL
        .into_iter()
        .filter(|&recipient| is_compatible(recipient, donor))
        .collect()
}

/// Binary compatibility as a score, for external callers (UI badges).
#[inline]
pub fn compatibility_score(recipient: BloodType, donor: BloodType) -> f64 {
    if is_compatible(recipient, donor) {
        1.0
    } else {
        0.0
    }
}
