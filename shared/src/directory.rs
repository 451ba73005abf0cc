//! Static helplines, legal experts and downloadable resources shown on the
//! legal support screen, plus the always-present support numbers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Helpline {
    pub id: &'static str,
    pub title: &'static str,
    pub number: &'static str,
    pub hours: &'static str,
}

impl Helpline {
    #[must_use]
    pub fn tel_url(&self) -> String {
        tel_url(self.number)
    }
}

pub const HELPLINES: [Helpline; 4] = [
    Helpline {
        id: "emergency_help",
        title: "Emergency Help",
        number: "1091",
        hours: "24/7",
    },
    Helpline {
        id: "womens_helpline",
        title: "Women's Helpline",
        number: "1091",
        hours: "24/7",
    },
    Helpline {
        id: "legal_aid",
        title: "Legal Aid Services",
        number: "15100",
        hours: "9 AM - 6 PM",
    },
    Helpline {
        id: "domestic_violence",
        title: "Domestic Violence Helpline",
        number: "181",
        hours: "24/7",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegalExpert {
    pub initials: &'static str,
    pub name: &'static str,
    pub field: &'static str,
    pub experience: &'static str,
    pub consultations: &'static str,
    pub status: Availability,
    pub languages: &'static str,
    pub rating: f32,
}

pub const EXPERTS: [LegalExpert; 3] = [
    LegalExpert {
        initials: "PS",
        name: "Adv. Priya Sharma",
        field: "Women's Rights & Family Law",
        experience: "12 years experience",
        consultations: "500+ consultations",
        status: Availability::Available,
        languages: "Hindi, English",
        rating: 4.9,
    },
    LegalExpert {
        initials: "MG",
        name: "Adv. Meera Gupta",
        field: "Domestic Violence & Criminal Law",
        experience: "8 years experience",
        consultations: "320+ consultations",
        status: Availability::Busy,
        languages: "Hindi, English",
        rating: 4.8,
    },
    LegalExpert {
        initials: "KR",
        name: "Adv. Kavita Reddy",
        field: "Workplace Harassment & Rights",
        experience: "15 years experience",
        consultations: "650+ consultations",
        status: Availability::Available,
        languages: "English, Hindi",
        rating: 4.9,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegalResource {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: &'static str,
    pub downloads: &'static str,
    pub tag: &'static str,
    pub url: &'static str,
}

pub const RESOURCES: [LegalResource; 3] = [
    LegalResource {
        id: "safety_rights_handbook",
        title: "Women's Safety Rights Handbook",
        kind: "PDF",
        downloads: "1.2k downloads",
        tag: "Guide",
        url: "https://www.unwomen.org/sites/default/files/Headquarters/Attachments/Sections/Library/Publications/2012/12/UNW_Legislation-Handbook%20pdf.pdf",
    },
    LegalResource {
        id: "file_an_fir",
        title: "How to File an FIR",
        kind: "Article",
        downloads: "900 downloads",
        tag: "Awareness",
        url: "https://www.humanrightsinitiative.org/publications/police/fir.pdf",
    },
    LegalResource {
        id: "legal_aid_directory",
        title: "Legal Aid Services Directory",
        kind: "Document",
        downloads: "700 downloads",
        tag: "Support",
        url: "https://acf.gov/sites/default/files/documents/orr/english_legal_service_providers_guide_with_form_508.pdf",
    },
];

/// Numbers appended after the user's own contacts in the support network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportNumber {
    pub id: &'static str,
    pub label: &'static str,
    pub number: &'static str,
    pub subtitle: &'static str,
}

pub const SUPPORT_DEFAULTS: [SupportNumber; 2] = [
    SupportNumber {
        id: "police",
        label: "Police (15)",
        number: "15",
        subtitle: "Police Emergency",
    },
    SupportNumber {
        id: "national_emergency",
        label: "National Emergency (112)",
        number: "112",
        subtitle: "Unified Emergency",
    },
];

#[must_use]
pub fn helpline(id: &str) -> Option<&'static Helpline> {
    HELPLINES.iter().find(|h| h.id == id)
}

#[must_use]
pub fn resource(id: &str) -> Option<&'static LegalResource> {
    RESOURCES.iter().find(|r| r.id == id)
}

/// `tel:` URL with spaces and dashes stripped from the number.
#[must_use]
pub fn tel_url(number: &str) -> String {
    let digits: String = number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    format!("tel:{digits}")
}
