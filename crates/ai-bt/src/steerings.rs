use ai_core::{AgentPtr, FactoryError, MoveVector, Steering, Vec3};

/// Always asks for no movement.
pub struct Stop;

impl Steering for Stop {
    fn name(&self) -> &str {
        "Stop"
    }

    fn execute(&self, _agent: &AgentPtr, _speed: f32) -> MoveVector {
        MoveVector::default()
    }
}

/// `Fixed{x,y,z,rotation}`: a constant direction scaled by the requested speed.
pub struct FixedSteering {
    direction: Vec3,
    rotation: f32,
}

impl FixedSteering {
    pub fn new(parameters: &str) -> Result<Self, FactoryError> {
        let values = parameters
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>();
        match values.as_deref() {
            Ok([x, y, z]) => Ok(Self {
                direction: Vec3::new(*x, *y, *z),
                rotation: 0.0,
            }),
            Ok([x, y, z, rotation]) => Ok(Self {
                direction: Vec3::new(*x, *y, *z),
                rotation: *rotation,
            }),
            _ => Err(FactoryError::InvalidParameters {
                parameters: parameters.to_string(),
                reason: "expected x,y,z[,rotation]".to_string(),
            }),
        }
    }
}

impl Steering for FixedSteering {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn execute(&self, _agent: &AgentPtr, speed: f32) -> MoveVector {
        let d = self.direction;
        MoveVector::new(Vec3::new(d.x * speed, d.y * speed, d.z * speed), self.rotation)
    }
}
