//! Fixed stimulus material presented during an administration.
//!
//! Clients read these to drive the session; examiner captures record the
//! stimulus they were scored against.

/// Words read aloud in the memory trials and asked for again in delayed recall.
pub const MEMORY_WORDS: [&str; 5] = ["ROSTRO", "SEDA", "IGLESIA", "CLAVEL", "ROJO"];

/// Category hint and multiple-choice options for one memory word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecallCue {
    pub word: &'static str,
    pub category: &'static str,
    pub choices: [&'static str; 3],
}

pub const RECALL_CUES: [RecallCue; 5] = [
    RecallCue {
        word: "ROSTRO",
        category: "parte del cuerpo",
        choices: ["Nariz", "Rostro", "Mano"],
    },
    RecallCue {
        word: "SEDA",
        category: "tipo de tela",
        choices: ["Lana", "Algodón", "Seda"],
    },
    RecallCue {
        word: "IGLESIA",
        category: "tipo de edificio",
        choices: ["Iglesia", "Escuela", "Hospital"],
    },
    RecallCue {
        word: "CLAVEL",
        category: "tipo de flor",
        choices: ["Rosa", "Clavel", "Margarita"],
    },
    RecallCue {
        word: "ROJO",
        category: "un color",
        choices: ["Rojo", "Azul", "Verde"],
    },
];

/// Cue for a target word, matched case-insensitively.
pub fn cue_for(word: &str) -> Option<&'static RecallCue> {
    let word = word.trim();
    RECALL_CUES.iter().find(|c| c.word.eq_ignore_ascii_case(word))
}

pub const DIGITS_FORWARD: [u8; 5] = [2, 1, 8, 5, 4];
pub const DIGITS_BACKWARD: [u8; 3] = [7, 4, 2];

/// Letters read at one per second; the patient taps on every `A`.
pub const LETTER_SEQUENCE: &str = "F B A C M N A A J K L B A F A K D E A A A J A M O F A A B";

/// Serial subtraction starts here and steps down by seven.
pub const SERIAL_START: u32 = 100;
pub const SERIAL_STEP: u32 = 7;

pub const SENTENCE_1: &str =
    "El gato se esconde bajo el sofá cuando los perros entran en la sala";
pub const SENTENCE_2: &str = "Espero que él le entregue el mensaje una vez que ella se lo pida";

/// Verbal fluency window, in seconds.
pub const FLUENCY_SECONDS: u32 = 60;

/// Weekday names as the patient is expected to say them, Monday first.
pub const WEEKDAYS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_memory_word_has_a_cue_with_itself_among_choices() {
        for word in MEMORY_WORDS {
            let cue = cue_for(word).unwrap();
            assert!(cue.choices.iter().any(|c| c.eq_ignore_ascii_case(word)));
        }
        assert!(cue_for("rojo").is_some());
        assert!(cue_for("AZUL").is_none());
    }

    #[test]
    fn letter_sequence_contains_targets() {
        let taps = LETTER_SEQUENCE.split(' ').filter(|l| *l == "A").count();
        assert_eq!(taps, 11);
    }
}
