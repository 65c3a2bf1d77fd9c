use crate::cpu::thumb::instruction::ThumbModeInstruction;

/// A fetched Thumb halfword together with its decoded form.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ThumbModeOpcode {
    pub instruction: ThumbModeInstruction,
    pub raw: u16,
}

impl From<u16> for ThumbModeOpcode {
    fn from(op_code: u16) -> Self {
        Self {
            instruction: ThumbModeInstruction::from(op_code),
            raw: op_code,
        }
    }
}

impl std::ops::Deref for ThumbModeOpcode {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl std::fmt::Display for ThumbModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}: {}", self.raw, self.instruction)
    }
}
