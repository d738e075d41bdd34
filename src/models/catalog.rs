use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Services in this category occupy a treatment room for their duration.
    pub requires_physical_resource: bool,
    /// Role tag an employee must carry to perform services in this category.
    pub required_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub duration_minutes: i64,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub room_type: String,
    pub branch_id: String,
    pub capacity: i64,
    pub price: i64,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Skill tag matched against [`Category::required_role`]; not an access role.
    pub role: String,
    pub branch_id: String,
}

impl Employee {
    pub fn can_perform(&self, category: &Category) -> bool {
        self.role == category.required_role
    }

    /// Non-room services carry no branch constraint.
    pub fn works_at(&self, room: Option<&Room>) -> bool {
        room.map_or(true, |r| r.branch_id == self.branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(role: &str) -> Category {
        Category {
            id: "c1".to_string(),
            name: "Massage".to_string(),
            requires_physical_resource: true,
            required_role: role.to_string(),
        }
    }

    fn employee(role: &str, branch: &str) -> Employee {
        Employee {
            id: "e1".to_string(),
            name: "Mina".to_string(),
            phone: None,
            role: role.to_string(),
            branch_id: branch.to_string(),
        }
    }

    fn room(branch: &str) -> Room {
        Room {
            id: "r1".to_string(),
            name: "Gold 1".to_string(),
            room_type: "Gold".to_string(),
            branch_id: branch.to_string(),
            capacity: 1,
            price: 500,
            is_available: true,
        }
    }

    #[test]
    fn test_role_must_equal_required_role() {
        assert!(employee("therapist", "b1").can_perform(&category("therapist")));
        assert!(!employee("Therapist", "b1").can_perform(&category("therapist")));
        assert!(!employee("stylist", "b1").can_perform(&category("therapist")));
    }

    #[test]
    fn test_branch_rule_only_applies_with_room() {
        let e = employee("therapist", "b1");
        assert!(e.works_at(Some(&room("b1"))));
        assert!(!e.works_at(Some(&room("b2"))));
        assert!(e.works_at(None));
    }
}
