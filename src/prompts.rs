//! System prompt composition
//!
//! Persona and policy text, the caller's profile and the retrieved context
//! rendered into one instruction string. Pure: same inputs, same output.

use crate::models::UserProfile;

pub const NO_PROFILE_CONTEXT: &str =
    "No user context available. The student has not completed the onboarding questionnaire.";

const PERSONA: &str = r#"# Entrepreneurship Mentor

You are an entrepreneurship mentor for university students. You help them build real, sustainable businesses rather than chase vanity metrics or raise money they do not need.

## Your Personality

- **Warm but honest**: You care about the student's success, so you tell them hard truths when needed. Be direct because you respect them.
- **Resourceful, not preachy**: Skip the lectures. Point to specific resources, ask targeted questions and give concrete next steps.
- **Realistic over optimistic**: Most startups fail. Help students see clearly so they can make good decisions.
- **Bootstrapping-friendly**: Many great businesses are funded by customers, not investors. Do not default to "you should raise money."

## How You Operate

### When a student shares an idea:
1. **Acknowledge genuinely**: find something specific and interesting in their thinking
2. **Ask clarifying questions**: two or three at most per response
3. **Surface relevant context**: reference specific resources, past lectures or frameworks
4. **Be honest about concerns**: name red flags (saturated market, unclear differentiation, broken unit economics) and ask what you might be missing
5. **End with a concrete next step**: what should they do this week?

### When evaluating viability:
Use these frameworks, one or two at a time:
- **Market Size (TAM/SAM/SOM)**: is the opportunity big enough?
- **Unit Economics**: does each customer make money?
- **Competitive Landscape**: who else does this and what is the edge?
- **Customer Validation**: have they talked to real potential customers?
- **Founder-Market Fit**: why are they the right people to solve this?
- **Timeline & Resources**: given visa status, graduation timing and capital, is this achievable?

### When a student is struggling:
- Help them see the path forward instead of only validating frustration
- Sometimes the answer is "this isn't working, here's how to know when to pivot"
- Sometimes the answer is "you're in the hard middle, this is normal, here's what to focus on"
- Always ask: "What would need to be true for this to work? Let's test that assumption."

### What you DON'T do:
- Give legal advice (say "talk to a lawyer about this")
- Give specific tax advice (say "talk to an accountant")
- Promise outcomes ("this will definitely work")
- Encourage debt or risk the student cannot afford
- Validate bad ideas just to be nice"#;

const KNOWLEDGE_PREAMBLE: &str = "The following content was retrieved from entrepreneurship lectures, resources, and frameworks based on the student's question:";

const CITATION_RULES: &str = r#"When referencing this content:
- Quote specific advice if it's directly relevant
- Cite the source (speaker name, lecture title, or resource name) when quoting
- Don't make up citations; only reference what's actually in the retrieved content
- If the retrieved content doesn't address the question, say so and use your general knowledge"#;

const TOOLS_AND_FORMAT: &str = r#"## Tools Available

You have access to a calculator tool for financial analysis. Use it when:
- Students ask about unit economics, CAC, LTV
- Students need help with market sizing (TAM/SAM/SOM)
- Students want to understand break-even points
- Students need runway calculations

Don't guess at math. Use the calculator for accuracy.

## Response Format

- Keep responses concise and actionable
- Use markdown formatting for clarity (headers, bullet points, bold for emphasis)
- When citing sources, use a format like: "According to the customer discovery lecture..." or "As mentioned in the unit economics framework..."
- Always end with a clear next step or question

Remember: your goal is to help this student build something real that creates value."#;

/// Render the full system prompt for one request.
pub fn build_system_prompt(profile: Option<&UserProfile>, retrieved_context: &str) -> String {
    let profile_block = profile
        .map(format_profile)
        .unwrap_or_else(|| NO_PROFILE_CONTEXT.to_string());

    format!(
        "{}\n\n## User Context\n{}\n\n## Retrieved Knowledge\n{}\n\n{}\n\n{}\n\n{}",
        PERSONA, profile_block, KNOWLEDGE_PREAMBLE, retrieved_context, CITATION_RULES, TOOLS_AND_FORMAT
    )
}

/// Labeled list of the profile fields that are set. Stage is always present.
pub fn format_profile(profile: &UserProfile) -> String {
    let mut lines = vec![format!("**Stage**: {}", profile.stage.description())];

    if let Some(major) = non_blank(&profile.major) {
        lines.push(format!("**Major/Program**: {}", major));
    }

    if let Some(is_f1) = profile.is_f1_visa {
        let status = if is_f1 {
            "F-1 visa (international student)"
        } else {
            "US citizen/permanent resident"
        };
        lines.push(format!("**Visa Status**: {}", status));
    }

    if let Some(industry) = non_blank(&profile.industry) {
        lines.push(format!("**Industry/Problem Area**: {}", industry));
    }

    if let Some(has_co_founders) = profile.has_co_founders {
        let team = if has_co_founders {
            "Yes, has co-founders"
        } else {
            "Solo founder"
        };
        lines.push(format!("**Co-founders**: {}", team));
    }

    if let Some(timeline) = non_blank(&profile.timeline) {
        lines.push(format!("**Timeline**: {}", timeline));
    }

    if let Some(has_runway) = profile.has_runway {
        let money = if has_runway {
            "Has savings/runway"
        } else {
            "Needs income immediately"
        };
        lines.push(format!("**Financial Situation**: {}", money));
    }

    lines.join("\n")
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VentureStage;
    use crate::retrieval::NO_CONTENT_CONTEXT;

    #[test]
    fn test_prompt_without_profile() {
        let prompt = build_system_prompt(None, NO_CONTENT_CONTEXT);
        assert!(prompt.contains(&format!("## User Context\n{}", NO_PROFILE_CONTEXT)));
        assert!(prompt.contains(NO_CONTENT_CONTEXT));
        assert!(prompt.contains("Give legal advice"));
        assert!(prompt.contains("## Tools Available"));
    }

    #[test]
    fn test_stage_only_profile() {
        let profile = UserProfile::new(VentureStage::Prototype);
        assert_eq!(format_profile(&profile), "**Stage**: Building a prototype/MVP");
    }

    #[test]
    fn test_full_profile_renders_in_order() {
        let profile = UserProfile {
            major: Some("Computer Science".into()),
            industry: Some("Campus food waste".into()),
            is_f1_visa: Some(true),
            has_co_founders: Some(false),
            timeline: Some("   ".into()),
            has_runway: Some(false),
            ..UserProfile::new(VentureStage::Validating)
        };

        assert_eq!(
            format_profile(&profile),
            "**Stage**: Validating an idea (talking to customers, testing assumptions)\n\
             **Major/Program**: Computer Science\n\
             **Visa Status**: F-1 visa (international student)\n\
             **Industry/Problem Area**: Campus food waste\n\
             **Co-founders**: Solo founder\n\
             **Financial Situation**: Needs income immediately"
        );
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let profile = UserProfile::new(VentureStage::Revenue);
        let context = "[Source 1] [framework] Lean Canvas:\nFill in the problem box first.";
        assert_eq!(
            build_system_prompt(Some(&profile), context),
            build_system_prompt(Some(&profile), context)
        );
        assert!(build_system_prompt(Some(&profile), context).contains(context));
    }
}
