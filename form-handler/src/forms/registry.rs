//! The form registry.
//!
//! Forms are a closed enum so that every place that needs per-form data (the
//! schema, the success action, the configured action kind) is an exhaustive
//! `match` and adding a form is a compile error until all of them are updated.

use std::fmt;
use std::sync::Arc;

use crate::actions::SubmissionAction;

/// Identifier of a configured form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormId {
    Contact,
    Newsletter,
    Quote,
}

impl FormId {
    /// Every form, in the order identifiers are listed to clients.
    pub const ALL: [FormId; 3] = [FormId::Contact, FormId::Newsletter, FormId::Quote];

    /// Wire identifier of the form.
    pub fn as_str(self) -> &'static str {
        match self {
            FormId::Contact => "contact",
            FormId::Newsletter => "newsletter",
            FormId::Quote => "quote",
        }
    }

    /// Resolve a wire identifier. Exact match, case-sensitive.
    pub fn parse(id: &str) -> Option<FormId> {
        match id {
            "contact" => Some(FormId::Contact),
            "newsletter" => Some(FormId::Newsletter),
            "quote" => Some(FormId::Quote),
            _ => None,
        }
    }

    /// Static schema of the form.
    pub fn schema(self) -> &'static FormSchema {
        match self {
            FormId::Contact => &CONTACT,
            FormId::Newsletter => &NEWSLETTER,
            FormId::Quote => &QUOTE,
        }
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field layout of a form.
#[derive(Debug, PartialEq, Eq)]
pub struct FormSchema {
    pub id: FormId,
    /// Checked in this order; error messages follow it.
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
}

const CONTACT: FormSchema = FormSchema {
    id: FormId::Contact,
    required_fields: &["name", "email", "message"],
    optional_fields: &["phone", "subject"],
};

const NEWSLETTER: FormSchema = FormSchema {
    id: FormId::Newsletter,
    required_fields: &["email"],
    optional_fields: &["name"],
};

const QUOTE: FormSchema = FormSchema {
    id: FormId::Quote,
    required_fields: &["name", "email", "phone", "details"],
    optional_fields: &["company", "budget"],
};

/// Success action for every form.
#[derive(Clone)]
pub struct FormActions {
    pub contact: Arc<dyn SubmissionAction>,
    pub newsletter: Arc<dyn SubmissionAction>,
    pub quote: Arc<dyn SubmissionAction>,
}

impl FormActions {
    /// Use the same action for every form.
    pub fn uniform(action: Arc<dyn SubmissionAction>) -> Self {
        Self {
            contact: Arc::clone(&action),
            newsletter: Arc::clone(&action),
            quote: action,
        }
    }

    /// The action configured for a form.
    pub fn get(&self, form: FormId) -> &Arc<dyn SubmissionAction> {
        match form {
            FormId::Contact => &self.contact,
            FormId::Newsletter => &self.newsletter,
            FormId::Quote => &self.quote,
        }
    }

    /// Close every distinct action once.
    pub async fn close(&self) {
        let mut closed: Vec<&Arc<dyn SubmissionAction>> = Vec::new();
        for form in FormId::ALL {
            let action = self.get(form);
            if closed.iter().any(|c| Arc::ptr_eq(c, action)) {
                continue;
            }
            action.close().await;
            closed.push(action);
        }
    }
}

/// A form resolved from a client-supplied identifier.
#[derive(Clone, Copy)]
pub struct RegisteredForm<'a> {
    pub schema: &'static FormSchema,
    pub action: &'a dyn SubmissionAction,
}

/// Immutable mapping from form identifier to schema and success action.
#[derive(Clone)]
pub struct FormRegistry {
    actions: FormActions,
}

impl FormRegistry {
    pub fn new(actions: FormActions) -> Self {
        Self { actions }
    }

    /// Look up a form by its wire identifier.
    pub fn lookup(&self, id: &str) -> Option<RegisteredForm<'_>> {
        let form = FormId::parse(id)?;
        Some(RegisteredForm {
            schema: form.schema(),
            action: self.actions.get(form).as_ref(),
        })
    }

    pub fn actions(&self) -> &FormActions {
        &self.actions
    }

    /// Identifiers of every configured form, comma separated.
    pub fn known_ids(&self) -> String {
        FormId::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::LogAction;

    fn registry() -> FormRegistry {
        FormRegistry::new(FormActions::uniform(Arc::new(LogAction)))
    }

    #[test]
    fn test_parse_round_trips_every_form() {
        for form in FormId::ALL {
            assert_eq!(FormId::parse(form.as_str()), Some(form));
            assert_eq!(form.schema().id, form);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(FormId::parse("Contact"), None);
        assert_eq!(FormId::parse("CONTACT"), None);
        assert_eq!(FormId::parse(" contact"), None);
    }

    #[test]
    fn test_lookup_known_form() {
        let registry = registry();
        let form = registry.lookup("contact").unwrap();

        assert_eq!(form.schema.id, FormId::Contact);
        assert_eq!(form.schema.required_fields, &["name", "email", "message"]);
        assert_eq!(form.action.name(), "log");
    }

    #[test]
    fn test_lookup_unknown_form() {
        assert!(registry().lookup("bogus").is_none());
        assert!(registry().lookup("").is_none());
    }

    #[test]
    fn test_known_ids_lists_all_forms() {
        assert_eq!(registry().known_ids(), "contact, newsletter, quote");
    }
}
