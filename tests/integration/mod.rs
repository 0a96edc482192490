mod helpers;
mod test_list;
mod test_publish;
mod test_resume;
