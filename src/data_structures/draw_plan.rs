//! The ordered list of draws a scene issues every frame.

use std::collections::HashSet;

use crate::error::SceneError;

/// One draw: a mesh rendered with a shader, optionally sampling a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawInstruction {
    pub id: String,
    pub mesh: String,
    pub shader: String,
    pub texture: Option<String>,
}

impl DrawInstruction {
    /// An empty `texture` name means the draw is untextured.
    pub fn new(id: &str, mesh: &str, shader: &str, texture: &str) -> Self {
        Self {
            id: id.to_owned(),
            mesh: mesh.to_owned(),
            shader: shader.to_owned(),
            texture: (!texture.is_empty()).then(|| texture.to_owned()),
        }
    }
}

/// Draw instructions in declaration order. Ids are unique.
#[derive(Clone, Debug, Default)]
pub struct DrawPlan {
    instructions: Vec<DrawInstruction>,
}

impl DrawPlan {
    pub fn new(instructions: Vec<DrawInstruction>) -> Result<Self, SceneError> {
        let mut seen = HashSet::new();
        for instruction in &instructions {
            if !seen.insert(instruction.id.as_str()) {
                return Err(SceneError::DuplicateDraw(instruction.id.clone()));
            }
        }
        Ok(Self { instructions })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawInstruction> {
        self.instructions.iter()
    }

    pub fn get(&self, id: &str) -> Option<&DrawInstruction> {
        self.instructions.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Every referenced name must exist in its registry.
    pub fn validate(
        &self,
        has_shader: impl Fn(&str) -> bool,
        has_mesh: impl Fn(&str) -> bool,
        has_texture: impl Fn(&str) -> bool,
    ) -> Result<(), SceneError> {
        for instruction in &self.instructions {
            let unresolved = |kind: &'static str, name: &str| SceneError::UnresolvedName {
                draw: instruction.id.clone(),
                kind,
                name: name.to_owned(),
            };
            if !has_shader(&instruction.shader) {
                return Err(unresolved("shader", &instruction.shader));
            }
            if !has_mesh(&instruction.mesh) {
                return Err(unresolved("mesh", &instruction.mesh));
            }
            if let Some(texture) = &instruction.texture {
                if !has_texture(texture) {
                    return Err(unresolved("texture", texture));
                }
            }
        }
        Ok(())
    }

    /// Distinct (shader, mesh) pairs in first-use order.
    pub fn shader_mesh_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for i in &self.instructions {
            let pair = (i.shader.as_str(), i.mesh.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }
}

impl<'a> IntoIterator for &'a DrawPlan {
    type Item = &'a DrawInstruction;
    type IntoIter = std::slice::Iter<'a, DrawInstruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_texture_means_untextured() {
        assert_eq!(DrawInstruction::new("a", "cube", "lit", "").texture, None);
        assert_eq!(
            DrawInstruction::new("a", "cube", "lit", "wood").texture.as_deref(),
            Some("wood")
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let plan = DrawPlan::new(vec![
            DrawInstruction::new("a", "cube", "lit", ""),
            DrawInstruction::new("a", "plane", "flat", ""),
        ]);
        assert!(matches!(plan, Err(SceneError::DuplicateDraw(id)) if id == "a"));
    }

    #[test]
    fn validation_names_the_missing_entry() {
        let plan = DrawPlan::new(vec![DrawInstruction::new("box", "cube", "lit", "wood")]).unwrap();
        let err = plan.validate(|_| true, |_| true, |t| t != "wood").unwrap_err();
        assert!(matches!(
            err,
            SceneError::UnresolvedName { draw, kind: "texture", name } if draw == "box" && name == "wood"
        ));
    }

    #[test]
    fn pairs_are_deduplicated_in_order() {
        let plan = DrawPlan::new(vec![
            DrawInstruction::new("a", "cube", "lit", ""),
            DrawInstruction::new("b", "plane", "flat", ""),
            DrawInstruction::new("c", "cube", "lit", "x"),
        ])
        .unwrap();
        assert_eq!(plan.shader_mesh_pairs(), vec![("lit", "cube"), ("flat", "plane")]);
    }
}
