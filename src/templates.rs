//! Fixed text used by the contract-type list and the local SOW draft.
//!
//! Kept in one place so wording changes touch a single file and tests can
//! inspect the blocks without rendering a whole draft.

use crate::model::ContractType;

/// One-line description shown next to each contract type.
pub fn contract_description(contract: ContractType) -> &'static str {
    match contract {
        ContractType::FixedPrice => {
            "Total project cost determined upfront with no changes regardless of resources used"
        }
        ContractType::TimeAndMaterials => {
            "Billing based on actual time spent and materials used during the project"
        }
        ContractType::StaffAugmentation => {
            "Resources provided at an agreed hourly/daily/monthly rate"
        }
    }
}

/// Description and benefits block for the "Contract Model" section.
pub fn contract_details(contract: Option<ContractType>) -> &'static str {
    match contract {
        Some(ContractType::FixedPrice) => {
            "**Description:** Total project cost is determined upfront and remains fixed regardless of actual resources used. This model provides cost certainty and transfers delivery risk to the service provider.

**Benefits:**
- Predictable budget and costs
- Clear scope and deliverables
- Risk transfer to service provider
- Simplified contract management"
        }
        Some(ContractType::TimeAndMaterials) => {
            "**Description:** Billing is based on actual time spent and materials used during the project. This model provides flexibility for evolving requirements and scope changes.

**Benefits:**
- Flexibility for changing requirements
- Pay for actual work performed
- Easier scope modifications
- Transparent cost tracking"
        }
        Some(ContractType::StaffAugmentation) => {
            "**Description:** Provider resources are supplied at agreed hourly/daily/monthly rates to supplement the client's existing team. This model provides access to specialized skills and expertise.

**Benefits:**
- Access to specialized expertise
- Scalable resource allocation
- Integration with existing teams
- Knowledge transfer opportunities"
        }
        None => "Contract model details to be defined.",
    }
}

/// Body of the "Pricing Structure" section.
pub fn pricing_structure(contract: Option<ContractType>) -> &'static str {
    match contract {
        Some(ContractType::FixedPrice) => {
            "**Fixed Price Model:**
- Total project cost: $XXX,XXX (to be determined based on final scope)
- Payment schedule: 20% upon contract signing, 30% at design completion, 30% at implementation completion, 20% upon final acceptance
- No additional charges for scope within agreed parameters
- Change requests will be handled through formal change control process"
        }
        Some(ContractType::TimeAndMaterials) => {
            "**Time and Materials Model:**
- Senior Consultant: $XXX per hour
- Consultant: $XXX per hour
- Junior Consultant: $XXX per hour
- Project Manager: $XXX per hour
- Materials and expenses at cost plus 10% markup
- Monthly invoicing based on actual hours worked"
        }
        Some(ContractType::StaffAugmentation) => {
            "**Staff Augmentation Model:**
- Senior Resource: $XXX per day/month
- Mid-level Resource: $XXX per day/month
- Junior Resource: $XXX per day/month
- Minimum commitment: 3 months
- 30-day notice for resource changes
- Monthly invoicing in advance"
        }
        None => "Pricing structure to be determined based on selected contract model.",
    }
}

pub const PROJECT_OVERVIEW: &str = "This Statement of Work (SOW) outlines the scope, deliverables, timeline, and terms for the project based on the selected contract model and proposal documents.";

pub const SCOPE_OF_WORK: &str = "Based on the selected proposal documents and contract type, this project will encompass:

1. **Requirements Analysis** - Review and analysis of all provided documentation
2. **Solution Design** - Technical and functional design based on requirements
3. **Implementation** - Development and deployment of the solution
4. **Testing & Quality Assurance** - Comprehensive testing protocols
5. **Documentation** - Complete project documentation and user guides
6. **Training & Support** - End-user training and ongoing support";

pub const DELIVERABLES: &str = "1. **Project Initiation Document** - Project charter and initial planning
2. **Technical Specification** - Detailed technical requirements and architecture
3. **Implementation Plan** - Phased approach to solution delivery
4. **Testing Documentation** - Test plans, cases, and results
5. **Deployment Package** - Production-ready solution with deployment guides
6. **User Documentation** - Comprehensive user manuals and training materials
7. **Support Documentation** - Maintenance and support procedures";

pub const ACCEPTANCE_CRITERIA: &str = "1. All deliverables must be completed according to the specifications outlined in the reference documents
2. All deliverables must pass quality assurance testing and client review
3. Solution must meet all functional and non-functional requirements
4. Complete documentation must be provided for all components
5. Client sign-off is required for each major milestone and final project completion";

pub const RISK_MANAGEMENT: &str = "- Regular progress reviews and milestone checkpoints
- Change management process for scope modifications
- Quality gates at each phase to ensure deliverable standards
- Escalation procedures for issue resolution";

pub const COMMUNICATION_PLAN: &str = "- Weekly status reports and progress updates
- Bi-weekly stakeholder meetings
- Monthly executive summaries
- Ad-hoc communication as needed for critical issues";

pub const SIGNATURES: &str = "- **Client Representative:** __________________________ Date: __________
- **Provider Project Manager:** __________________________ Date: __________
- **Provider Engagement Partner:** ________________________ Date: __________";

/// Timeline milestones as (label, days after project start).
pub const TIMELINE: [(&str, i64); 6] = [
    ("Project Start", 0),
    ("Requirements Phase", 14),
    ("Design Phase", 35),
    ("Implementation Phase", 70),
    ("Testing Phase", 84),
    ("Project Completion", 90),
];
