//! Document tasks and their fixed instructions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocAssistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    ImproveWriting,
    HelpMeWrite,
    Ask,
    BrainstormIdeas,
    ContinueWriting,
    Summarize,
    FindActionItems,
    BlogPost,
    ProsAndCons,
    SocialMediaPost,
    Outline,
    CreativeStory,
    Poem,
    Essay,
    MeetingAgenda,
    PressRelease,
    JobDescription,
    SalesEmail,
    RecruitingEmail,
    FixSpellingAndGrammar,
    ExplainThis,
    MakeLonger,
    MakeShorter,
    UseSimplerLanguage,
}

const ALL: [Task; 24] = [
    Task::ImproveWriting,
    Task::HelpMeWrite,
    Task::Ask,
    Task::BrainstormIdeas,
    Task::ContinueWriting,
    Task::Summarize,
    Task::FindActionItems,
    Task::BlogPost,
    Task::ProsAndCons,
    Task::SocialMediaPost,
    Task::Outline,
    Task::CreativeStory,
    Task::Poem,
    Task::Essay,
    Task::MeetingAgenda,
    Task::PressRelease,
    Task::JobDescription,
    Task::SalesEmail,
    Task::RecruitingEmail,
    Task::FixSpellingAndGrammar,
    Task::ExplainThis,
    Task::MakeLonger,
    Task::MakeShorter,
    Task::UseSimplerLanguage,
];

impl Task {
    /// Every task, in menu order.
    pub fn all() -> impl Iterator<Item = Task> {
        ALL.into_iter()
    }

    pub fn name(self) -> &'static str {
        match self {
            Task::ImproveWriting => "improve-writing",
            Task::HelpMeWrite => "help-me-write",
            Task::Ask => "ask",
            Task::BrainstormIdeas => "brainstorm-ideas",
            Task::ContinueWriting => "continue-writing",
            Task::Summarize => "summarize",
            Task::FindActionItems => "find-action-items",
            Task::BlogPost => "blog-post",
            Task::ProsAndCons => "pros-and-cons",
            Task::SocialMediaPost => "social-media-post",
            Task::Outline => "outline",
            Task::CreativeStory => "creative-story",
            Task::Poem => "poem",
            Task::Essay => "essay",
            Task::MeetingAgenda => "meeting-agenda",
            Task::PressRelease => "press-release",
            Task::JobDescription => "job-description",
            Task::SalesEmail => "sales-email",
            Task::RecruitingEmail => "recruiting-email",
            Task::FixSpellingAndGrammar => "fix-spelling-and-grammar",
            Task::ExplainThis => "explain-this",
            Task::MakeLonger => "make-longer",
            Task::MakeShorter => "make-shorter",
            Task::UseSimplerLanguage => "use-simpler-language",
        }
    }

    /// The system instruction sent with this task. Empty for [`Task::Ask`].
    /// Multi-line instructions are flattened by the request builder like any other text.
    pub fn instruction(self) -> &'static str {
        match self {
            Task::ImproveWriting => {
                "You are an assistant helping to improve a piece of writing. Don't change the ideas, just improve the writing."
            }
            Task::HelpMeWrite => {
                "You are an assistant helping a user write more content in a document based on a prompt. Output in markdown format. Do not use links. Do not include literal content from the original document.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\
                 Output in [Identified language of the document]:\n\
                 [Output based on the prompt, in markdown format.]"
            }
            Task::Ask => "",
            Task::BrainstormIdeas => {
                "You are an assistant helping brainstorm a list of ideas inside a document.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\
                 10 ideas based on the topic, in [Identified language of the prompt]:\n\n\
                 - [Idea 1]\n- [Idea 2]\n- [Idea 3]\n- [Idea 4]\n- [Idea 5]\n\
                 - [Idea 6]\n- [Idea 7]\n- [Idea 8]\n- [Idea 9]\n- [Idea 10]"
            }
            Task::ContinueWriting => {
                "You are an assistant helping a user write a document. Output how the document continues, no more than 3 sentences. Output in markdown format. Do not use links.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Continuation in [Identified language of the document]:\n\
                 [Continuation of the document in markdown format, no more than 3 sentences.]"
            }
            Task::Summarize => {
                "You are an assistant helping summarize a document. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Summary in [Identified language of the document]:\n\n\
                 [One-paragraph summary of the document using the identified language.]"
            }
            Task::FindActionItems => {
                "You are an assistant helping find action items inside a document. An action item is an extracted task or to-do found inside of an unstructured document. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 List of action items in [Identified language of the document]:\n\
                 [List of action items in the identified language, in markdown format. Prefix each line with \"- []\" to make it a checkbox.]"
            }
            Task::BlogPost => {
                "You are an assistant helping to generate a blog post on a given topic.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Blog post in [Identified language of the topic]\n\n\
                 # [Topic of the blog post]\n\
                 [Blog post body]"
            }
            Task::ProsAndCons => {
                "You are an assistant helping to generate a list of pros and cons about a topic. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Pros and cons in [Identified language of the topic]:\n\n\
                 ## [\"Pros\" in the identified language]\n\n\
                 [List of 5 pros, one sentence each.]\n\n\
                 ## [\"Cons\" in the identified language]\n\n\
                 [List of 5 cons, one sentence each.]"
            }
            Task::SocialMediaPost => {
                "You are an assistant helping to draft a social media post. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Post in [Identified language of the topic]:\n\n\
                 # [Title]\n\n\
                 [One paragraph post body]\n\n\
                 Tags: [List of relevant #hashtags]"
            }
            Task::Outline => {
                "You are an assistant helping to draft an outline for a document. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Outline in [Identified language of the topic]:\n\n\
                 # [Title of document]\n\
                 [Bulleted list outline of document, in markdown format]"
            }
            Task::CreativeStory => {
                "You are an assistant helping to write a creative story. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Story in [Identified language of the topic]:\n\n\
                 # [Title of story]\n\
                 [First 5 paragraphs of story]"
            }
            Task::Poem => {
                "You are an assistant helping to write a poem. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Poem in [Identified language of the topic]:\n\n\
                 # [Title of poem]\n\
                 [Poem, at least 4 lines]"
            }
            Task::Essay => {
                "You are an assistant helping to write an essay.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Essay in [Identified language of the topic]:\n\n\
                 # [Essay title]\n\n\
                 [Introduction paragraph]\n\n\
                 ## [Name of topic 1]\n\n[Paragraph about topic 1]\n\n\
                 ## [Name of topic 2]\n\n[Paragraph about topic 2]\n\n\
                 ## [Name of topic 3]\n\n[Paragraph about topic 3]\n\n\
                 ## ['Conclusion', in the identified language of the topic]\n\n\
                 [Conclusion paragraph]"
            }
            Task::MeetingAgenda => {
                "You are an assistant helping to write a meeting agenda.\n\
                 Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Meeting agenda in [Identified language of the topic]:\n\n\
                 # [Meeting name]\n\n\
                 [Introduction paragraph about the purpose and goals of the meeting]\n\n\
                 [Bulleted list of at least 3 topics, in markdown format. Make sure to include details for each topic.]"
            }
            Task::PressRelease => {
                "You are an assistant helping to draft a press release. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Press release in [Identified language of the topic]:\n\n\
                 # [Press release headline]\n\
                 [Press release body, in markdown format.]"
            }
            Task::JobDescription => {
                "You are an assistant helping to draft a job description. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Job description in [Identified language of the prompt]:\n\n\
                 # [Job title]\n\n\
                 ## [\"Overview\", in the identified language]\n\n\
                 [Overview of job, one paragraph]\n\n\
                 ## [\"Responsibilities\", in the identified language]\n\n\
                 [Bulleted list of at least 3 key responsibilities]\n\n\
                 ## [\"Qualifications\", in the identified language]\n\n\
                 [Bulleted list of at least 3 key qualifications]"
            }
            Task::SalesEmail => {
                "You are an assistant helping to draft a personalized sales email. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Output in [Identified language of the prompt]:\n\n\
                 # [Sales email title]\n\
                 [Sales email subject]\n\n\
                 [Sales email body]"
            }
            Task::RecruitingEmail => {
                "You are an assistant helping to draft a personalized recruiting email. Use this format, replacing text in brackets with the result. Do not include the brackets in the output:\n\n\
                 Recruiting email in [Identified language of the notes]:\n\n\
                 # [Recruiting email title]\n\n\
                 [Recruiting email subject] [Recruiting email body]"
            }
            Task::FixSpellingAndGrammar => {
                "You are an assistant helping to fix spelling and grammar in a piece of writing. Don't change the ideas, just fix the spelling and grammar."
            }
            Task::ExplainThis => {
                "You will be given a text. Explain the text in a clear and easy to understand way. Don't make it too basic or too advanced."
            }
            Task::MakeLonger => {
                "You will be given a text. Make it longer. Don't change the ideas, just make it longer."
            }
            Task::MakeShorter => {
                "You will be given a text. Make it shorter. Don't change the ideas, just make it shorter."
            }
            Task::UseSimplerLanguage => {
                "You will be given a text. Rewrite the text to use simpler language. Don't change the ideas, just use simpler language."
            }
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = DocAssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| DocAssistError::Validation(format!("unknown task '{s}'")))
    }
}
