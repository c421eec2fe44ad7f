//! User-facing texts

use crate::config::GradeRules;
use crate::grades::{GradeEntry, PendingEntry};

pub const START_TEXT: &str =
    "🎓 Hi! I can calculate your weighted grade average.\nLet's get your grades in.";
pub const EXACT_SCIENCES_QUESTION: &str =
    "❓ Are you studying for an exact-sciences degree (math, computer science, etc.)?";
pub const EXACT_ACKNOWLEDGEMENT: &str = "📌 Noted: you are studying an exact-sciences degree.";
pub const NOT_EXACT_ACKNOWLEDGEMENT: &str =
    "📌 Noted: you are not studying an exact-sciences degree.";
pub const COURSE_TYPE_QUESTION_SHORT: &str = "❓ Is the course regular or advanced?";
pub const COURSE_TYPE_QUESTION_LONG: &str = "❓ Are the courses regular or advanced?";
pub const ADD_GRADE: &str = "📌 Enter more grades and then choose their course type, or load stored grades and add them to these.\n\
To delete grades by index press 'Delete grades by index'.\n\
When you are done press 'Done'.\n\n";
pub const END_TEXT: &str = "🚫 The conversation has ended. Send /start to begin again.";
pub const DELETE_GRADE_PROMPT: &str =
    "📌 Enter the index numbers of the grades you want to delete\n(for example 3 2 1).";
pub const WRONG_NUMBER_ERROR: &str = "❌ That is not a valid number. Please try again.";
pub const LOAD_GRADES_ERROR: &str = "❌ There are no stored grades to load.";
pub const SUCCESSFULLY_LOADED_GRADES: &str = "✅ Grades loaded.";
pub const NOT_EXISTS_SAVED_GRADES_PROMPT: &str =
    "❓ You have not saved any grades yet.\nWould you like to save the current grades?";
pub const EXISTS_SAVED_GRADES_PROMPT: &str =
    "❓ Would you like to save the current grades?\n(this overwrites your previous save)";
pub const SUCCESSFULLY_SAVED_GRADES: &str = "✅ Grades saved.";
pub const SUCCESSFULLY_NOT_SAVED_GRADES: &str = "✅ Grades were not saved.";
pub const SUCCESSFULLY_ADDED_GRADES: &str = "✅ Grades added.";
pub const SUCCESSFULLY_DELETED_GRADES: &str = "✅ Grades deleted.";
pub const COMPUTING_AVERAGE: &str = "🔄 Calculating average...";
pub const WAITING_FOR_INDICES: &str = "Waiting for indices...";
pub const WAITING_FOR_DEGREE_TYPE: &str = "Waiting for degree type...";
pub const GOING_BACK_TO_GRADES_INPUT: &str = "🔙 Back to grade entry...";
pub const NO_GRADES_ERROR: &str = "❌ No grades have been entered yet.";
pub const UNKNOWN_COMMAND: &str = "❌ Unknown command. Send /start to begin.";
pub const UNKNOWN_TEXT_BEFORE_START: &str =
    "❌ Start the conversation first by sending /start.";
pub const CHOOSE_BUTTON_FIRST: &str = "❌ Please choose one of the buttons above.";
pub const CHOOSE_DEGREE_FIRST: &str =
    "❌ First tell me whether you study exact sciences, using the Yes / No buttons above.";
pub const CHOOSE_COURSE_TYPE_FIRST: &str =
    "❌ First choose whether these courses are advanced or regular, using the buttons above.";
pub const CHOOSE_SAVE_FIRST: &str =
    "❌ First choose whether to save these grades, using the buttons above.";
pub const FINISH_DELETION_FIRST: &str =
    "❌ Enter the indices to delete, or press 'Back' to return.";
pub const ENTER_GRADES_OR_BUTTON: &str =
    "❌ Enter grades in the format shown above, or use one of the buttons.";
pub const TEXT_EXPECTED: &str = "❌ Please reply with a text message.";
pub const FEEDBACK_PROMPT: &str = "✍️ Write your feedback in a single message.";
pub const FEEDBACK_THANKS: &str = "🙏 Thanks, your feedback was sent.";
pub const BROADCAST_PROMPT: &str = "📢 Write the message to send to every user.";
pub const TARGET_USER_PROMPT: &str = "👤 Enter the id of the user to message.";
pub const SOMETHING_WENT_WRONG: &str = "⚠️ Something went wrong, please try again.";
pub const NOT_FINISHED_LOADING: &str = "⏳ Still working on your last request, try again.";

pub fn grade_prompt(rules: &GradeRules) -> String {
    format!(
        "📌 Enter grades and credits in this format, one course per line:\n\
         [course name] <grade {}-{}> <credits {}-{}>\n\
         (grade first, then credits). For example:\n\
         Calculus 90 5\n\
         80 4\n\
         Then choose the course type, or load grades you stored earlier.",
        rules.score_range.start(),
        rules.score_range.end(),
        rules.credit_range.start(),
        rules.credit_range.end(),
    )
}

pub fn degree_acknowledgement(is_exact_sciences: bool) -> &'static str {
    if is_exact_sciences {
        EXACT_ACKNOWLEDGEMENT
    } else {
        NOT_EXACT_ACKNOWLEDGEMENT
    }
}

pub fn course_type_question(pending: &[PendingEntry]) -> &'static str {
    if pending.len() == 1 {
        COURSE_TYPE_QUESTION_SHORT
    } else {
        COURSE_TYPE_QUESTION_LONG
    }
}

pub fn average_message(average: f64) -> String {
    format!("🎓 Your weighted average is: {average:.2}")
}

pub fn private_message_prompt(target: i64) -> String {
    format!("✍️ Write the message for user {target}.")
}

/// Numbered list of the grades entered so far.
///
/// Course types are shown only to exact-sciences students, for whom they
/// change the weight.
pub fn history(grades: &[GradeEntry], is_exact_sciences: bool) -> String {
    let mut out = String::from("Grades entered so far:\n");
    for (i, grade) in grades.iter().enumerate() {
        out.push_str(&format!("{}. ", i + 1));
        if !grade.description.is_empty() {
            out.push_str(&grade.description);
            out.push_str(" - ");
        }
        out.push_str(&format!("grade: {}, credits: {}", grade.score, grade.credits));
        if is_exact_sciences {
            out.push_str(if grade.is_advanced {
                " (advanced)"
            } else {
                " (regular)"
            });
        }
        out.push('\n');
    }
    out
}
