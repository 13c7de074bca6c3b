mod test_answer_path;
mod test_candidate_queue;
mod test_negotiation_failure;
