use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::Layout;

pub type PersonId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Accepts PED-style codes (`1`/`2`/`0`) as well as names.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "1" | "m" | "male" => Some(Self::Male),
            "2" | "f" | "female" => Some(Self::Female),
            "0" | "u" | "unknown" | "other" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl TryFrom<String> for Sex {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_token(&value).ok_or_else(|| format!("unknown sex `{value}`"))
    }
}

/// Derived fields written back by [`Pedigree::apply_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub generation: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub father: Option<PersonId>,
    #[serde(default)]
    pub mother: Option<PersonId>,
    #[serde(default)]
    pub spouses: Vec<PersonId>,
    #[serde(default)]
    pub children: Vec<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl Person {
    pub fn new(id: impl Into<PersonId>, sex: Sex) -> Self {
        Self {
            id: id.into(),
            sex,
            label: None,
            father: None,
            mother: None,
            spouses: Vec::new(),
            children: Vec::new(),
            placement: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub person1: PersonId,
    pub person2: PersonId,
    #[serde(default)]
    pub children: Vec<PersonId>,
    #[serde(default)]
    pub consanguineous: bool,
    #[serde(default)]
    pub divorced: bool,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        person1: impl Into<PersonId>,
        person2: impl Into<PersonId>,
    ) -> Self {
        Self {
            id: id.into(),
            person1: person1.into(),
            person2: person2.into(),
            children: Vec::new(),
            consanguineous: false,
            divorced: false,
        }
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PersonId>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn involves(&self, id: &str) -> bool {
        self.person1 == id || self.person2 == id
    }

    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.person1 == a && self.person2 == b) || (self.person1 == b && self.person2 == a)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PedigreeError {
    #[error("unknown person `{0}`")]
    UnknownPerson(PersonId),
    #[error("person `{0}` already exists")]
    DuplicatePerson(PersonId),
    #[error("relationship `{0}` already exists")]
    DuplicateRelationship(String),
    #[error("unknown relationship `{0}`")]
    UnknownRelationship(String),
    #[error("person `{0}` cannot partner with themselves")]
    SelfPartnership(PersonId),
}

/// Serialized shape of a pedigree snapshot, as read by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PedigreeDocument {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// The family graph. Persons keep their insertion order, which is the
/// tiebreak for every ordering decision made by the layout engine.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    pub persons: BTreeMap<PersonId, Person>,
    pub relationships: Vec<Relationship>,
    order: Vec<PersonId>,
}

impl Pedigree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pedigree from raw records without validating links. Dangling
    /// references are kept as-is; a repeated person id replaces the earlier
    /// record but keeps its position.
    pub fn from_document(document: PedigreeDocument) -> Self {
        let mut pedigree = Self::new();
        for person in document.persons {
            if pedigree.persons.contains_key(&person.id) {
                tracing::warn!(id = %person.id, "duplicate person record replaces earlier one");
            } else {
                pedigree.order.push(person.id.clone());
            }
            pedigree.persons.insert(person.id.clone(), person);
        }
        pedigree.relationships = document.relationships;
        pedigree
    }

    pub fn to_document(&self) -> PedigreeDocument {
        PedigreeDocument {
            persons: self.persons_in_order().cloned().collect(),
            relationships: self.relationships.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.persons.get(id)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.id == id)
    }

    pub fn persons_in_order(&self) -> impl Iterator<Item = &Person> {
        self.order.iter().filter_map(|id| self.persons.get(id))
    }

    pub fn add_person(&mut self, person: Person) -> Result<(), PedigreeError> {
        if self.persons.contains_key(&person.id) {
            return Err(PedigreeError::DuplicatePerson(person.id));
        }
        self.order.push(person.id.clone());
        self.persons.insert(person.id.clone(), person);
        Ok(())
    }

    /// Inserts the person if missing and sets its sex either way.
    pub fn ensure_person(&mut self, id: &str, sex: Sex) -> &mut Person {
        if !self.persons.contains_key(id) {
            self.order.push(id.to_string());
        }
        let entry = self
            .persons
            .entry(id.to_string())
            .or_insert_with(|| Person::new(id, sex));
        entry.sex = sex;
        entry
    }

    pub fn update_person<F>(&mut self, id: &str, update: F) -> Result<(), PedigreeError>
    where
        F: FnOnce(&mut Person),
    {
        let person = self
            .persons
            .get_mut(id)
            .ok_or_else(|| PedigreeError::UnknownPerson(id.to_string()))?;
        update(person);
        // The id is the map key; keep it stable.
        person.id = id.to_string();
        Ok(())
    }

    /// Removes a person together with every reference to it.
    pub fn remove_person(&mut self, id: &str) -> Result<Person, PedigreeError> {
        let removed = self
            .persons
            .remove(id)
            .ok_or_else(|| PedigreeError::UnknownPerson(id.to_string()))?;
        self.order.retain(|other| other != id);
        for person in self.persons.values_mut() {
            if person.father.as_deref() == Some(id) {
                person.father = None;
            }
            if person.mother.as_deref() == Some(id) {
                person.mother = None;
            }
            person.spouses.retain(|other| other != id);
            person.children.retain(|other| other != id);
        }
        self.relationships.retain(|rel| !rel.involves(id));
        for rel in &mut self.relationships {
            rel.children.retain(|other| other != id);
        }
        Ok(removed)
    }

    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<(), PedigreeError> {
        if relationship.person1 == relationship.person2 {
            return Err(PedigreeError::SelfPartnership(relationship.person1));
        }
        if self.relationship(&relationship.id).is_some() {
            return Err(PedigreeError::DuplicateRelationship(relationship.id));
        }
        for id in [&relationship.person1, &relationship.person2]
            .into_iter()
            .chain(relationship.children.iter())
        {
            if !self.persons.contains_key(id) {
                return Err(PedigreeError::UnknownPerson(id.clone()));
            }
        }

        let partners = [
            (relationship.person1.clone(), relationship.person2.clone()),
            (relationship.person2.clone(), relationship.person1.clone()),
        ];
        for (id, partner) in &partners {
            if let Some(person) = self.persons.get_mut(id) {
                push_unique(&mut person.spouses, partner);
                for child in &relationship.children {
                    push_unique(&mut person.children, child);
                }
            }
        }

        let sexes: Vec<(PersonId, Sex)> = partners
            .iter()
            .filter_map(|(id, _)| self.persons.get(id).map(|p| (id.clone(), p.sex)))
            .collect();
        for child in &relationship.children {
            if let Some(person) = self.persons.get_mut(child) {
                for (parent, sex) in &sexes {
                    assign_parent_slot(person, parent, *sex);
                }
            }
        }

        self.relationships.push(relationship);
        Ok(())
    }

    /// Removes a relationship. The spouse link is dropped only when no other
    /// relationship joins the same pair; parent links of children stay.
    pub fn remove_relationship(&mut self, id: &str) -> Result<Relationship, PedigreeError> {
        let idx = self
            .relationships
            .iter()
            .position(|rel| rel.id == id)
            .ok_or_else(|| PedigreeError::UnknownRelationship(id.to_string()))?;
        let removed = self.relationships.remove(idx);
        let still_joined = self
            .relationships
            .iter()
            .any(|rel| rel.joins(&removed.person1, &removed.person2));
        if !still_joined {
            if let Some(person) = self.persons.get_mut(&removed.person1) {
                person.spouses.retain(|other| other != &removed.person2);
            }
            if let Some(person) = self.persons.get_mut(&removed.person2) {
                person.spouses.retain(|other| other != &removed.person1);
            }
        }
        Ok(removed)
    }

    pub fn set_parents(
        &mut self,
        child: &str,
        father: Option<&str>,
        mother: Option<&str>,
    ) -> Result<(), PedigreeError> {
        for id in [Some(child), father, mother].into_iter().flatten() {
            if !self.persons.contains_key(id) {
                return Err(PedigreeError::UnknownPerson(id.to_string()));
            }
        }
        let (old_father, old_mother) = {
            let person = self
                .persons
                .get_mut(child)
                .ok_or_else(|| PedigreeError::UnknownPerson(child.to_string()))?;
            let old = (person.father.take(), person.mother.take());
            person.father = father.map(str::to_string);
            person.mother = mother.map(str::to_string);
            old
        };
        for old in [old_father, old_mother].into_iter().flatten() {
            if Some(old.as_str()) == father || Some(old.as_str()) == mother {
                continue;
            }
            if let Some(parent) = self.persons.get_mut(&old) {
                parent.children.retain(|other| other != child);
            }
        }
        for parent in [father, mother].into_iter().flatten() {
            if let Some(parent) = self.persons.get_mut(parent) {
                push_unique(&mut parent.children, &child.to_string());
            }
        }
        Ok(())
    }

    /// Copies generation and coordinates from a layout onto the person
    /// records. Persons missing from the layout lose their placement.
    pub fn apply_layout(&mut self, layout: &Layout) {
        for person in self.persons.values_mut() {
            person.placement = layout.nodes.get(&person.id).map(|node| Placement {
                generation: node.generation,
                x: node.x,
                y: node.y,
            });
        }
    }
}

fn push_unique(list: &mut Vec<PersonId>, id: &PersonId) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.clone());
    }
}

fn assign_parent_slot(child: &mut Person, parent: &str, sex: Sex) {
    if child.father.as_deref() == Some(parent) || child.mother.as_deref() == Some(parent) {
        return;
    }
    match sex {
        Sex::Male => {
            if child.father.is_none() {
                child.father = Some(parent.to_string());
            }
        }
        Sex::Female => {
            if child.mother.is_none() {
                child.mother = Some(parent.to_string());
            }
        }
        Sex::Unknown => {
            if child.father.is_none() {
                child.father = Some(parent.to_string());
            } else if child.mother.is_none() {
                child.mother = Some(parent.to_string());
            }
        }
    }
}
