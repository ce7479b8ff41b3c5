use std::collections::BTreeMap;

use crate::models::{RegistrationForm, RegistrationRecord};

/// Check every field and report all violations together; nothing is
/// submitted while this map is non-empty.
pub fn validate(form: &RegistrationForm) -> BTreeMap<&'static str, String> {
    let mut errors = BTreeMap::new();
    if form.event.is_empty() {
        errors.insert("event", "Event is required.".to_string());
    }
    if form.name.is_empty() {
        errors.insert("name", "Name is required.".to_string());
    }
    if form.department.is_empty() {
        errors.insert("department", "Department is required.".to_string());
    }
    if form.year.is_empty() {
        errors.insert("year", "Year is required.".to_string());
    }
    if form.roll_no.is_empty() {
        errors.insert("rollNo", "Roll number is required.".to_string());
    }
    if form.phone.is_empty() {
        errors.insert("phone", "Phone number is required.".to_string());
    } else if !is_ten_digits(&form.phone) {
        errors.insert("phone", "Phone number must be exactly 10 digits.".to_string());
    }
    errors
}

fn is_ten_digits(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Key/value pairs for the form-encoded POST body. `group` is only
/// sent when the participant filled it in.
pub fn form_fields(form: &RegistrationForm) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("event", form.event.clone()),
        ("name", form.name.clone()),
        ("department", form.department.clone()),
        ("year", form.year.clone()),
        ("rollNo", form.roll_no.clone()),
        ("phone", form.phone.clone()),
    ];
    if !form.group.is_empty() {
        fields.push(("group", form.group.clone()));
    }
    fields
}

/// Advisory duplicate check against the last-fetched listing: matches
/// on (event, department, year, roll number) ignoring case. This is a
/// UX convenience only; the sheet backing the endpoint is the authority
/// and may still accept duplicates it never told us about.
pub fn find_existing_registration<'a>(
    records: &'a [RegistrationRecord],
    form: &RegistrationForm,
) -> Option<&'a RegistrationRecord> {
    records.iter().find(|record| {
        eq_fold(&record.event, &form.event)
            && eq_fold(&record.department, &form.department)
            && eq_fold(record.year.as_deref().unwrap_or(""), &form.year)
            && eq_fold(&record.roll_no, &form.roll_no)
    })
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> RegistrationForm {
        RegistrationForm {
            event: "Dance".to_string(),
            name: "Bob".to_string(),
            department: "Physics".to_string(),
            year: "UG 1st Year".to_string(),
            roll_no: "101".to_string(),
            phone: "9999999999".to_string(),
            group: String::new(),
        }
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let errors = validate(&RegistrationForm::default());
        assert_eq!(errors.len(), 6);
        for field in ["event", "name", "department", "year", "rollNo", "phone"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn phone_must_be_exactly_ten_digits() {
        let mut form = filled_form();
        form.phone = "12345".to_string();
        assert_eq!(
            validate(&form).get("phone").map(String::as_str),
            Some("Phone number must be exactly 10 digits.")
        );

        form.phone = "98765432101".to_string();
        assert!(validate(&form).contains_key("phone"));

        form.phone = "98765x4321".to_string();
        assert!(validate(&form).contains_key("phone"));

        form.phone = "9876543210".to_string();
        assert!(validate(&form).is_empty());
    }

    #[test]
    fn valid_form_encodes_expected_fields() {
        let form = filled_form();
        assert!(validate(&form).is_empty());
        let fields = form_fields(&form);
        assert_eq!(
            fields,
            vec![
                ("event", "Dance".to_string()),
                ("name", "Bob".to_string()),
                ("department", "Physics".to_string()),
                ("year", "UG 1st Year".to_string()),
                ("rollNo", "101".to_string()),
                ("phone", "9999999999".to_string()),
            ]
        );

        let mut with_group = form;
        with_group.group = "Team B".to_string();
        assert_eq!(
            form_fields(&with_group).last(),
            Some(&("group", "Team B".to_string()))
        );
    }

    #[test]
    fn duplicate_guard_matches_case_insensitively() {
        let records = vec![RegistrationRecord {
            event: "dance".to_string(),
            name: "Someone Else".to_string(),
            department: "PHYSICS".to_string(),
            year: Some("ug 1st year".to_string()),
            roll_no: "101".to_string(),
            reg_num: "REG-042".to_string(),
            group: None,
        }];

        let found = find_existing_registration(&records, &filled_form());
        assert_eq!(found.map(|r| r.reg_num.as_str()), Some("REG-042"));

        let mut other_roll = filled_form();
        other_roll.roll_no = "102".to_string();
        assert!(find_existing_registration(&records, &other_roll).is_none());
    }

    #[test]
    fn duplicate_guard_treats_missing_year_as_empty() {
        let records = vec![RegistrationRecord {
            event: "Dance".to_string(),
            department: "Physics".to_string(),
            year: None,
            roll_no: "101".to_string(),
            reg_num: "REG-001".to_string(),
            ..RegistrationRecord::default()
        }];

        let mut form = filled_form();
        assert!(find_existing_registration(&records, &form).is_none());

        form.year = String::new();
        assert!(find_existing_registration(&records, &form).is_some());
    }
}
