//! Prompt templates for the debate

use crate::participant::Participant;

/// Persona for a participant. Kept as the first thing each provider sees.
pub fn system_prompt(participant: Participant) -> String {
    let style = match participant {
        Participant::Gemini => "Give short, clear and decisive answers. Keep the debate lively.",
        Participant::DeepSeek => {
            "Give short, clear and decisive answers. Bring strong arguments to keep the debate lively."
        }
    };
    format!(
        "You are an AI assistant named {name}. You are debating a topic chosen by the user \
         with another AI assistant, {opponent}.\n\
         Each turn, state ONLY YOUR OWN view. Never answer on {opponent}'s behalf and never \
         simulate a dialogue.\n\
         {style}",
        name = participant.name(),
        opponent = participant.other().name(),
    )
}

/// First prompt of a run, sent to the opening speaker only
pub fn opening_prompt(topic: &str) -> String {
    format!(
        "The user wants you to debate the following topic with the other AI assistant: \"{topic}\".\n\
         Open the debate by stating your OPENING ARGUMENT on this topic. Give only your own \
         initial view and wait for the other side to answer."
    )
}

/// Prompt for `speaker`, quoting the opponent's last reply verbatim
pub fn rebuttal_prompt(speaker: Participant, previous_reply: &str) -> String {
    format!(
        "{opponent}'s argument is: \"{previous_reply}\"\n\
         What is your response to this argument? Give only your own answer.",
        opponent = speaker.other().name(),
    )
}
