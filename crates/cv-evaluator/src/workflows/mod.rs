pub mod cv_evaluation;
